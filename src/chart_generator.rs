use crate::aggregator::RankedColorList;
use crate::error::{AnalysisError, Result};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const CHART_NAME: &str = "histogram.svg";

const BAR_SLOT: f64 = 40.0;
const MIN_WIDTH: f64 = 800.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 60.0;
/// Above this many bars the hex labels under the x axis are hidden.
const LABEL_LIMIT: usize = 30;

/// Write the chart to `output_path`. An empty ranking has nothing to draw:
/// no file is written and `Ok(false)` is returned.
pub fn generate_chart(ranking: &RankedColorList, output_path: &Path) -> Result<bool> {
    if ranking.is_empty() {
        info!("no color data, skipping chart {}", output_path.display());
        return Ok(false);
    }

    let output_error = |source: std::io::Error| AnalysisError::Output {
        path: output_path.to_path_buf(),
        source,
    };

    let file = File::create(output_path).map_err(output_error)?;
    let mut writer = BufWriter::new(file);
    write_chart(&mut writer, ranking).map_err(output_error)?;
    writer.flush().map_err(output_error)?;
    Ok(true)
}

pub fn chart_to_string(ranking: &RankedColorList) -> std::io::Result<String> {
    let mut buffer = Vec::new();
    write_chart(&mut buffer, ranking)?;
    String::from_utf8(buffer).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Bar chart of the ranked colors. Bar heights are relative to the most
/// common color, each bar filled with the color it stands for.
pub fn write_chart<W: Write>(out: &mut W, ranking: &RankedColorList) -> std::io::Result<()> {
    let bars = ranking.colors();
    let show_labels = bars.len() <= LABEL_LIMIT;
    let margin_bottom = if show_labels { 90.0 } else { 50.0 };

    let width = (bars.len() as f64 * BAR_SLOT + MARGIN_LEFT + MARGIN_RIGHT).max(MIN_WIDTH);
    let plot_width = width - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = HEIGHT - MARGIN_TOP - margin_bottom;
    let baseline = MARGIN_TOP + plot_height;

    writeln!(
        out,
        r#"<svg width="{w}" height="{h}" viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg" font-family="sans-serif">"#,
        w = width,
        h = HEIGHT
    )?;
    writeln!(out, r##"  <rect width="{}" height="{}" fill="#ffffff"/>"##, width, HEIGHT)?;

    let mut title = format!("Color distribution (top {} colors", bars.len());
    if ranking.is_truncated() {
        title.push_str(&format!(" of {}", ranking.distinct_colors()));
    }
    title.push(')');
    writeln!(
        out,
        r#"  <text x="{:.1}" y="30" font-size="16" text-anchor="middle">{}</text>"#,
        width / 2.0,
        title
    )?;

    writeln!(
        out,
        r#"  <text x="20" y="{:.1}" font-size="12" text-anchor="middle" transform="rotate(-90 20 {:.1})">Pixel share (%)</text>"#,
        MARGIN_TOP + plot_height / 2.0,
        MARGIN_TOP + plot_height / 2.0
    )?;
    writeln!(
        out,
        r##"  <line x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}" stroke="#333333"/>"##,
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = baseline
    )?;
    writeln!(
        out,
        r##"  <line x1="{l:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}" stroke="#333333"/>"##,
        l = MARGIN_LEFT,
        r = MARGIN_LEFT + plot_width,
        b = baseline
    )?;

    let max_share = bars.first().map_or(0.0, |c| c.percentage);
    if bars.is_empty() || max_share <= 0.0 {
        writeln!(out, "</svg>")?;
        return Ok(());
    }

    let slot = plot_width / bars.len() as f64;
    let bar_width = slot * 0.8;

    for (i, bar) in bars.iter().enumerate() {
        let height = bar.percentage / max_share * plot_height;
        let x = MARGIN_LEFT + i as f64 * slot + (slot - bar_width) / 2.0;
        let y = baseline - height;
        let center = x + bar_width / 2.0;
        let hex = bar.hex();

        writeln!(
            out,
            r##"  <rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke="#808080" stroke-width="0.5"><title>{} {:.2}%</title></rect>"##,
            x, y, bar_width, height, hex, hex, bar.percentage
        )?;
        writeln!(
            out,
            r#"  <text x="{:.2}" y="{:.2}" font-size="8" text-anchor="middle">{:.2}%</text>"#,
            center,
            y - 3.0,
            bar.percentage
        )?;

        if show_labels {
            writeln!(
                out,
                r#"  <text x="{x:.2}" y="{y:.2}" font-size="8" text-anchor="end" transform="rotate(-90 {x:.2} {y:.2})">{label}</text>"#,
                x = center,
                y = baseline + 6.0,
                label = hex
            )?;
        }
    }

    if !show_labels {
        writeln!(
            out,
            r#"  <text x="{:.1}" y="{:.1}" font-size="12" text-anchor="middle">{} most common colors (labels hidden)</text>"#,
            MARGIN_LEFT + plot_width / 2.0,
            baseline + 30.0,
            bars.len()
        )?;
    }

    writeln!(out, "</svg>")?;
    Ok(())
}
