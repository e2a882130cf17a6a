//! Weighted median-cut palette reduction.
//!
//! Distinct colors and their pixel counts are laid out in one buffer. Each
//! [`ColorBox`] owns a contiguous range of that buffer, so splitting a box is a
//! sort of its range followed by a cut; no colors are copied. Boxes live in a
//! flat arena and are split in a fixed order:
//!
//! * the box to split is the splittable one (two or more distinct colors) with
//!   the largest `weight * widest channel range`; ties go to the lowest arena
//!   index,
//! * the split channel is the one with the largest range, preferring red, then
//!   green, then blue on ties,
//! * the cut falls after the first color (ordered by channel value, then r, g, b)
//!   at which the running weight reaches half of the box weight.
//!
//! The left half takes the parent's slot in the arena and the right half is
//! appended, which keeps the resulting palette order reproducible.

use crate::aggregator::ColorCount;
use crate::image_processor::Pixel;
use log::{debug, info, warn};
use rgb::RGB8;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantizeError {
    #[error("color weights overflowed while summing a box")]
    WeightOverflow,

    #[error("cannot split a box holding {0} color(s)")]
    DegenerateSplit(usize),

    #[error("box has no pixel weight")]
    EmptyBox,

    #[error("color {0:?} has no representative")]
    UnmappedColor(Pixel),
}

/// Outcome of a quantization request.
#[derive(Debug, Clone, PartialEq)]
pub enum Quantization {
    /// Palette size 0: canonical colors are used as they are.
    Disabled,
    Mapped(ColorMapping),
    /// Quantization failed; canonical colors are used instead.
    Fallback(QuantizeError),
}

impl Quantization {
    pub fn mapping(&self) -> Option<&ColorMapping> {
        match self {
            Quantization::Mapped(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Quantization::Fallback(_))
    }
}

/// Maps every distinct input color to a representative palette color.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMapping {
    palette: Vec<Pixel>,
    map: HashMap<Pixel, Pixel>,
}

impl ColorMapping {
    pub fn identity(colors: impl IntoIterator<Item = Pixel>) -> Self {
        let palette: Vec<Pixel> = colors.into_iter().collect();
        let map = palette.iter().map(|&c| (c, c)).collect();
        Self { palette, map }
    }

    /// Representative colors in box order. May contain duplicates when two
    /// boxes average to the same color.
    pub fn palette(&self) -> &[Pixel] {
        &self.palette
    }

    pub fn map(&self, color: Pixel) -> Option<Pixel> {
        self.map.get(&color).copied()
    }

    pub fn is_identity(&self) -> bool {
        self.map.iter().all(|(from, to)| from == to)
    }

    pub fn apply(&self, pixels: &[Pixel]) -> Result<Vec<Pixel>, QuantizeError> {
        pixels
            .iter()
            .map(|&p| self.map(p).ok_or(QuantizeError::UnmappedColor(p)))
            .collect()
    }

    /// Re-aggregate counts under the mapping. First-encountered order of the
    /// result matches what counting the mapped pixel sequence would give.
    pub fn remap_counts(&self, counts: &ColorCount) -> Result<ColorCount, QuantizeError> {
        let mut remapped = ColorCount::new();
        for (color, count) in counts.iter() {
            let target = self.map(color).ok_or(QuantizeError::UnmappedColor(color))?;
            remapped.add_n(target, count);
        }
        Ok(remapped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColorBox {
    start: usize,
    end: usize,
    weight: u64,
    min: [u8; 3],
    max: [u8; 3],
}

fn channel(color: Pixel, ch: usize) -> u8 {
    match ch {
        0 => color.r,
        1 => color.g,
        _ => color.b,
    }
}

impl ColorBox {
    fn new(entries: &[(Pixel, u64)], start: usize, end: usize) -> Result<Self, QuantizeError> {
        let mut weight = 0u64;
        let mut min = [u8::MAX; 3];
        let mut max = [u8::MIN; 3];
        for &(color, count) in &entries[start..end] {
            weight = weight
                .checked_add(count)
                .ok_or(QuantizeError::WeightOverflow)?;
            for ch in 0..3 {
                min[ch] = min[ch].min(channel(color, ch));
                max[ch] = max[ch].max(channel(color, ch));
            }
        }
        Ok(Self {
            start,
            end,
            weight,
            min,
            max,
        })
    }

    fn len(&self) -> usize {
        self.end - self.start
    }

    fn is_splittable(&self) -> bool {
        self.len() > 1
    }

    fn range(&self, ch: usize) -> u8 {
        self.max[ch] - self.min[ch]
    }

    fn widest_channel(&self) -> usize {
        let mut best = 0;
        for ch in 1..3 {
            if self.range(ch) > self.range(best) {
                best = ch;
            }
        }
        best
    }

    fn score(&self) -> u64 {
        self.weight
            .saturating_mul(self.range(self.widest_channel()) as u64)
    }
}

/// Index of the next box to split, or `None` when every box holds one color.
fn select_box(boxes: &[ColorBox]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (i, b) in boxes.iter().enumerate() {
        if !b.is_splittable() {
            continue;
        }
        let score = b.score();
        match best {
            Some((_, s)) if s >= score => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

fn split_box(
    entries: &mut [(Pixel, u64)],
    b: ColorBox,
) -> Result<(ColorBox, ColorBox), QuantizeError> {
    if !b.is_splittable() {
        return Err(QuantizeError::DegenerateSplit(b.len()));
    }

    let ch = b.widest_channel();
    let slice = &mut entries[b.start..b.end];
    slice.sort_by_key(|&(c, _)| (channel(c, ch), c.r, c.g, c.b));

    let mut running = 0u64;
    let mut cut = slice.len();
    for (i, &(_, count)) in slice.iter().enumerate() {
        running += count;
        if running.saturating_mul(2) >= b.weight {
            cut = i + 1;
            break;
        }
    }
    let cut = cut.clamp(1, slice.len() - 1);

    let left = ColorBox::new(entries, b.start, b.start + cut)?;
    let right = ColorBox::new(entries, b.start + cut, b.end)?;
    Ok((left, right))
}

/// Count-weighted mean of a box, rounded to nearest per channel.
fn weighted_average(entries: &[(Pixel, u64)]) -> Result<Pixel, QuantizeError> {
    let mut sums = [0u64; 3];
    let mut weight = 0u64;
    for &(color, count) in entries {
        for (ch, sum) in sums.iter_mut().enumerate() {
            let term = (channel(color, ch) as u64)
                .checked_mul(count)
                .ok_or(QuantizeError::WeightOverflow)?;
            *sum = sum.checked_add(term).ok_or(QuantizeError::WeightOverflow)?;
        }
        weight = weight
            .checked_add(count)
            .ok_or(QuantizeError::WeightOverflow)?;
    }
    if weight == 0 {
        return Err(QuantizeError::EmptyBox);
    }

    let avg = |sum: u64| ((sum + weight / 2) / weight).min(255) as u8;
    Ok(RGB8::new(avg(sums[0]), avg(sums[1]), avg(sums[2])))
}

/// Reduce weighted distinct colors to at most `max_colors` representatives.
pub fn median_cut(
    histogram: &[(Pixel, u64)],
    max_colors: usize,
) -> Result<ColorMapping, QuantizeError> {
    let mut entries = histogram.to_vec();
    if entries.is_empty() || max_colors == 0 {
        return Ok(ColorMapping::identity(Vec::new()));
    }

    let mut boxes = Vec::with_capacity(max_colors);
    boxes.push(ColorBox::new(&entries, 0, entries.len())?);

    while boxes.len() < max_colors {
        let Some(idx) = select_box(&boxes) else {
            break;
        };
        let (left, right) = split_box(&mut entries, boxes[idx])?;
        debug!(
            "split box {} ({} colors, weight {}) into {} + {}",
            idx,
            boxes[idx].len(),
            boxes[idx].weight,
            left.len(),
            right.len()
        );
        boxes[idx] = left;
        boxes.push(right);
    }

    let mut palette = Vec::with_capacity(boxes.len());
    let mut map = HashMap::with_capacity(entries.len());
    for b in &boxes {
        let members = &entries[b.start..b.end];
        let representative = weighted_average(members)?;
        palette.push(representative);
        for &(color, _) in members {
            map.insert(color, representative);
        }
    }

    Ok(ColorMapping { palette, map })
}

/// Build a mapping for already-counted colors. `max_colors == 0` disables
/// quantization; faults are returned as [`Quantization::Fallback`].
pub fn quantize_counts(counts: &ColorCount, max_colors: usize) -> Quantization {
    if max_colors == 0 {
        return Quantization::Disabled;
    }

    if counts.len() <= max_colors {
        info!(
            "{} distinct colors fit a palette of {}; quantization is a no-op",
            counts.len(),
            max_colors
        );
        return Quantization::Mapped(ColorMapping::identity(
            counts.iter().map(|(color, _)| color),
        ));
    }

    match median_cut(counts.entries(), max_colors) {
        Ok(mapping) => {
            info!(
                "reduced {} distinct colors to a palette of {}",
                counts.len(),
                mapping.palette().len()
            );
            Quantization::Mapped(mapping)
        }
        Err(e) => {
            warn!("quantization failed, using unquantized colors: {}", e);
            Quantization::Fallback(e)
        }
    }
}

/// Quantize a canonical pixel sequence to at most `max_colors` colors.
pub fn quantize(pixels: &[Pixel], max_colors: usize) -> Quantization {
    if max_colors == 0 {
        return Quantization::Disabled;
    }
    let counts: ColorCount = pixels.iter().copied().collect();
    quantize_counts(&counts, max_colors)
}

/// Quantize a pixel sequence and return the mapped pixels. On failure the
/// input pixels come back unchanged together with the fallback reason.
pub fn quantize_pixels(pixels: Vec<Pixel>, max_colors: usize) -> (Vec<Pixel>, Quantization) {
    let outcome = quantize(&pixels, max_colors);
    apply_quantization(pixels, outcome)
}

/// Map `pixels` through the outcome of [`quantize`]. Anything other than a
/// non-identity mapping passes the pixels through.
pub fn apply_quantization(pixels: Vec<Pixel>, outcome: Quantization) -> (Vec<Pixel>, Quantization) {
    let applied = match &outcome {
        Quantization::Mapped(mapping) if !mapping.is_identity() => Some(mapping.apply(&pixels)),
        _ => None,
    };

    match applied {
        None => (pixels, outcome),
        Some(Ok(quantized)) => (quantized, outcome),
        Some(Err(e)) => {
            warn!("quantization failed, using unquantized colors: {}", e);
            (pixels, Quantization::Fallback(e))
        }
    }
}

/// Quantize and re-aggregate counts in one step. On failure the input counts
/// are handed back unchanged together with the fallback reason.
pub fn quantize_color_count(counts: ColorCount, max_colors: usize) -> (ColorCount, Quantization) {
    let outcome = quantize_counts(&counts, max_colors);
    let remapped = match &outcome {
        Quantization::Mapped(mapping) if !mapping.is_identity() => {
            Some(mapping.remap_counts(&counts))
        }
        _ => None,
    };

    match remapped {
        None => (counts, outcome),
        Some(Ok(quantized)) => (quantized, outcome),
        Some(Err(e)) => {
            warn!("quantization failed, using unquantized colors: {}", e);
            (counts, Quantization::Fallback(e))
        }
    }
}
