mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use color_histogram::{
    analyze, default_output_dir, quantization_summary, write_artifacts, AnalysisOptions,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let options = AnalysisOptions {
        top: cli.top,
        palette_size: cli.quantize,
    };
    let output_dir = cli
        .output_dir
        .unwrap_or_else(|| default_output_dir(&cli.image));

    println!("Analyzing image: {}", cli.image.display());
    let analysis = analyze(&cli.image, &options)?;

    println!(
        "Analysis complete, found {} distinct colors.",
        analysis.original_colors
    );
    if let Some(note) = quantization_summary(&analysis) {
        println!("{}", note);
    }

    let ranking = &analysis.ranking;
    if ranking.is_empty() {
        println!("No color data to report.");
        return Ok(());
    }
    if ranking.is_truncated() {
        println!(
            "Note: image contains {} colors, showing the top {} ({} omitted).",
            ranking.distinct_colors(),
            ranking.len(),
            ranking.omitted()
        );
    }

    let artifacts = write_artifacts(ranking, &output_dir, cli.json);
    for path in &artifacts.written {
        println!("Saved {}", path.display());
    }
    for failure in &artifacts.failures {
        eprintln!("Error: {}", failure);
    }

    Ok(())
}
