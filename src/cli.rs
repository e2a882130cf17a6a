use clap::Parser;
use color_histogram::{DEFAULT_PALETTE_SIZE, DEFAULT_TOP};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "color-histogram")]
#[command(about = "Analyze the color distribution of an image")]
#[command(version)]
pub struct Cli {
    /// Input image file
    pub image: PathBuf,

    /// Number of most common colors to chart and report (default: 50)
    #[arg(short, long, default_value_t = DEFAULT_TOP, value_parser = parse_top)]
    pub top: usize,

    /// Palette size for median-cut quantization, 0 to count exact colors (default: 64)
    #[arg(short, long, default_value_t = DEFAULT_PALETTE_SIZE)]
    pub quantize: usize,

    /// Output directory (default: report/<image name>/)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Also write the report as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_top(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}
