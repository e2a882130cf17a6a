//! color-histogram - color composition analysis for raster images
//!
//! Counts how often each distinct color occurs in an image, optionally after
//! reducing the palette, and ranks the colors by frequency.
//!
//! ## Pipeline
//!
//! - **Canonicalization**: indexed, RGBA and RGB images become plain RGB
//!   pixels; alpha is composited onto black
//! - **Quantization**: weighted median-cut down to at most K colors, with a
//!   non-fatal fallback to the original colors
//! - **Aggregation**: frequency count and a ranked, capped color list
//! - **Output**: SVG bar chart, text report and optional JSON report
//!
//! ## Example
//!
//! ```rust,no_run
//! use color_histogram::{analyze, AnalysisOptions};
//! use std::path::Path;
//!
//! let options = AnalysisOptions {
//!     top: 10,
//!     palette_size: 32,
//! };
//!
//! let analysis = analyze(Path::new("input.png"), &options).expect("Analysis failed");
//! for color in analysis.ranking.colors() {
//!     println!("{}\t{:.2}%", color.hex(), color.percentage);
//! }
//! ```

pub mod aggregator;
pub mod chart_generator;
pub mod error;
pub mod image_processor;
pub mod quantizer;
pub mod report;

pub use aggregator::{rank, ColorCount, RankedColor, RankedColorList};
pub use chart_generator::generate_chart;
pub use error::{AnalysisError, Result};
pub use image_processor::{canonicalize, load_image, ImageData, NativeImage, Pixel, PixelEncoding};
pub use quantizer::{
    apply_quantization, quantize, quantize_pixels, ColorMapping, QuantizeError, Quantization,
};
pub use report::{format_text_report, write_json_report, write_text_report};

use log::info;
use std::path::{Path, PathBuf};

pub const DEFAULT_TOP: usize = 50;
pub const DEFAULT_PALETTE_SIZE: usize = 64;
/// Parent of the per-image output directories.
pub const REPORT_DIR: &str = "report";

/// Options for a color analysis
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Maximum number of ranked colors (default: 50)
    pub top: usize,
    /// Median-cut palette size, 0 disables quantization (default: 64)
    pub palette_size: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            top: DEFAULT_TOP,
            palette_size: DEFAULT_PALETTE_SIZE,
        }
    }
}

/// Result of analysing one image.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub width: u32,
    pub height: u32,
    /// Distinct canonical colors before quantization.
    pub original_colors: usize,
    pub quantization: Quantization,
    /// Counts after quantization (or the canonical counts when it was skipped or failed).
    pub counts: ColorCount,
    pub ranking: RankedColorList,
}

/// Load, canonicalize and analyse an image file.
///
/// Fails only when the file is missing, cannot be decoded, or uses an
/// unsupported pixel encoding.
pub fn analyze(path: &Path, options: &AnalysisOptions) -> Result<Analysis> {
    let native = load_image(path)?;
    let image = canonicalize(native)?;
    Ok(analyze_image(image, options))
}

/// Analyse an already canonical image. Never fails: quantization problems are
/// reported through [`Analysis::quantization`].
pub fn analyze_image(image: ImageData, options: &AnalysisOptions) -> Analysis {
    let ImageData {
        width,
        height,
        pixels,
    } = image;

    let counts = ColorCount::from_pixels(pixels);
    let original_colors = counts.len();
    info!(
        "{}x{} image has {} distinct colors",
        width, height, original_colors
    );

    let (counts, quantization) = quantizer::quantize_color_count(counts, options.palette_size);
    let ranking = rank(&counts, options.top);

    Analysis {
        width,
        height,
        original_colors,
        quantization,
        counts,
        ranking,
    }
}

/// One-line note on what quantization did, or `None` when it was disabled or
/// left the colors unchanged.
pub fn quantization_summary(analysis: &Analysis) -> Option<String> {
    match &analysis.quantization {
        Quantization::Disabled => None,
        Quantization::Mapped(mapping) if mapping.is_identity() => None,
        Quantization::Mapped(_) => Some(format!(
            "Quantized {} colors down to {}.",
            analysis.original_colors,
            analysis.counts.len()
        )),
        Quantization::Fallback(reason) => Some(format!(
            "Quantization failed ({}), using the original {} colors.",
            reason, analysis.original_colors
        )),
    }
}

/// `report/<file stem>` for the given input image.
pub fn default_output_dir(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Path::new(REPORT_DIR).join(stem)
}

/// What [`write_artifacts`] managed to write.
#[derive(Debug, Default)]
pub struct Artifacts {
    pub written: Vec<PathBuf>,
    pub failures: Vec<AnalysisError>,
}

impl Artifacts {
    fn record(&mut self, path: PathBuf, result: Result<()>) {
        match result {
            Ok(()) => self.written.push(path),
            Err(e) => self.failures.push(e),
        }
    }
}

/// Write the text report, the chart and optionally the JSON report into
/// `output_dir`, creating it if needed. A failing artifact does not stop the
/// others, and an empty ranking gets no chart.
pub fn write_artifacts(ranking: &RankedColorList, output_dir: &Path, json: bool) -> Artifacts {
    let mut artifacts = Artifacts::default();

    if let Err(source) = std::fs::create_dir_all(output_dir) {
        artifacts.failures.push(AnalysisError::Output {
            path: output_dir.to_path_buf(),
            source,
        });
        return artifacts;
    }

    let chart_path = output_dir.join(chart_generator::CHART_NAME);
    let text_path = output_dir.join(report::TEXT_REPORT_NAME);
    let json_path = output_dir.join(report::JSON_REPORT_NAME);

    artifacts.record(text_path.clone(), write_text_report(ranking, &text_path));
    match generate_chart(ranking, &chart_path) {
        Ok(true) => artifacts.written.push(chart_path),
        Ok(false) => {}
        Err(e) => artifacts.failures.push(e),
    }
    if json {
        artifacts.record(json_path.clone(), write_json_report(ranking, &json_path));
    }

    artifacts
}
