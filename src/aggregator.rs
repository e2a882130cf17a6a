use crate::image_processor::Pixel;
use std::collections::HashMap;

/// Occurrence count per distinct color, remembering first-encountered order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorCount {
    index: HashMap<Pixel, usize>,
    entries: Vec<(Pixel, u64)>,
    total: u64,
}

impl ColorCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pixels(pixels: impl IntoIterator<Item = Pixel>) -> Self {
        pixels.into_iter().collect()
    }

    pub fn add(&mut self, color: Pixel) {
        self.add_n(color, 1);
    }

    pub fn add_n(&mut self, color: Pixel, n: u64) {
        match self.index.get(&color) {
            Some(&i) => self.entries[i].1 += n,
            None => {
                self.index.insert(color, self.entries.len());
                self.entries.push((color, n));
            }
        }
        self.total += n;
    }

    pub fn get(&self, color: Pixel) -> u64 {
        self.index.get(&color).map_or(0, |&i| self.entries[i].1)
    }

    /// Number of distinct colors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn entries(&self) -> &[(Pixel, u64)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pixel, u64)> + '_ {
        self.entries.iter().copied()
    }
}

impl FromIterator<Pixel> for ColorCount {
    fn from_iter<I: IntoIterator<Item = Pixel>>(iter: I) -> Self {
        let mut counts = ColorCount::new();
        for color in iter {
            counts.add(color);
        }
        counts
    }
}

/// Uppercase `#RRGGBB`.
pub fn to_hex(color: Pixel) -> String {
    format!("#{:02X}{:02X}{:02X}", color.r, color.g, color.b)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedColor {
    pub color: Pixel,
    pub count: u64,
    /// Share of all pixels, 0.0 to 100.0.
    pub percentage: f64,
}

impl RankedColor {
    pub fn hex(&self) -> String {
        to_hex(self.color)
    }
}

/// Colors by descending count, capped at the requested length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankedColorList {
    colors: Vec<RankedColor>,
    total_pixels: u64,
    distinct_colors: usize,
}

impl RankedColorList {
    pub fn colors(&self) -> &[RankedColor] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Nothing to report: the image had no pixels or the cap was zero.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn total_pixels(&self) -> u64 {
        self.total_pixels
    }

    /// Distinct colors before truncation.
    pub fn distinct_colors(&self) -> usize {
        self.distinct_colors
    }

    /// Colors dropped by the cap.
    pub fn omitted(&self) -> usize {
        self.distinct_colors - self.colors.len()
    }

    pub fn is_truncated(&self) -> bool {
        self.omitted() > 0
    }
}

/// Rank colors by descending count and keep the first `top`.
///
/// The sort is stable, so equal counts keep first-encountered order.
pub fn rank(counts: &ColorCount, top: usize) -> RankedColorList {
    let mut sorted = counts.entries().to_vec();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted.truncate(top);

    let total = counts.total();
    let colors = sorted
        .into_iter()
        .map(|(color, count)| RankedColor {
            color,
            count,
            percentage: if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            },
        })
        .collect();

    RankedColorList {
        colors,
        total_pixels: total,
        distinct_colors: counts.len(),
    }
}
