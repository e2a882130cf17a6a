use crate::aggregator::RankedColorList;
use crate::error::{AnalysisError, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const TEXT_REPORT_NAME: &str = "color_report.txt";
pub const JSON_REPORT_NAME: &str = "color_report.json";

const SEPARATOR: &str = "=====================================";

/// Header, separator, then one `#RRGGBB\tPP.PP%` line per ranked color.
pub fn format_text_report(ranking: &RankedColorList) -> String {
    let mut out = format!("Dominant colors (top {})\n{}\n", ranking.len(), SEPARATOR);
    for color in ranking.colors() {
        out.push_str(&format!("{}\t{:.2}%\n", color.hex(), color.percentage));
    }
    out
}

pub fn write_text_report(ranking: &RankedColorList, path: &Path) -> Result<()> {
    std::fs::write(path, format_text_report(ranking)).map_err(|source| AnalysisError::Output {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Serialize)]
struct JsonColor {
    hex: String,
    rgb: [u8; 3],
    count: u64,
    percentage: f64,
}

#[derive(Debug, Serialize)]
struct JsonReport {
    total_pixels: u64,
    distinct_colors: usize,
    omitted: usize,
    colors: Vec<JsonColor>,
}

impl From<&RankedColorList> for JsonReport {
    fn from(ranking: &RankedColorList) -> Self {
        Self {
            total_pixels: ranking.total_pixels(),
            distinct_colors: ranking.distinct_colors(),
            omitted: ranking.omitted(),
            colors: ranking
                .colors()
                .iter()
                .map(|c| JsonColor {
                    hex: c.hex(),
                    rgb: [c.color.r, c.color.g, c.color.b],
                    count: c.count,
                    percentage: c.percentage,
                })
                .collect(),
        }
    }
}

pub fn to_json(ranking: &RankedColorList) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport::from(ranking))
}

pub fn write_json_report(ranking: &RankedColorList, path: &Path) -> Result<()> {
    let output_error = |source: std::io::Error| AnalysisError::Output {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(output_error)?);
    serde_json::to_writer_pretty(&mut writer, &JsonReport::from(ranking))
        .map_err(|e| output_error(e.into()))?;
    writeln!(writer).map_err(output_error)?;
    writer.flush().map_err(output_error)
}
