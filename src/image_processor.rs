pub use crate::error::Result;
use crate::error::AnalysisError;
use image::{DynamicImage, GenericImageView, ImageFormat};
use log::info;
use rgb::{RGB8, RGBA8};
use std::io::Cursor;
use std::path::Path;

/// A canonical 3-channel color.
pub type Pixel = RGB8;

/// Color that transparent pixels are composited onto when alpha is dropped.
pub const BACKDROP: Pixel = RGB8::new(0, 0, 0);

/// Pixel storage as decoded from the file, before canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelEncoding {
    /// Palette entries (with alpha from `tRNS`) and one palette index per pixel.
    Indexed { palette: Vec<RGBA8>, indices: Vec<u8> },
    Rgba(Vec<RGBA8>),
    Rgb(Vec<RGB8>),
}

#[derive(Debug, Clone)]
pub struct NativeImage {
    pub width: u32,
    pub height: u32,
    pub encoding: PixelEncoding,
}

impl NativeImage {
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// An image whose pixels are all canonical colors, in scan order.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Pixel>,
}

pub fn load_image(path: &Path) -> Result<NativeImage> {
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => AnalysisError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => AnalysisError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let format = image::guess_format(&bytes).map_err(|e| AnalysisError::decode(path, e))?;

    // Palette PNGs are read directly so the indices survive decoding.
    if format == ImageFormat::Png {
        if let Some(indexed) = decode_indexed_png(path, &bytes)? {
            info!(
                "decoded indexed PNG {}x{} from {}",
                indexed.width,
                indexed.height,
                path.display()
            );
            return Ok(indexed);
        }
    }

    let img = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| AnalysisError::decode(path, e))?;
    drop(bytes);

    let native = from_dynamic(img)?;
    info!(
        "decoded {:?} image {}x{} from {}",
        format,
        native.width,
        native.height,
        path.display()
    );
    Ok(native)
}

/// Classify an image decoded by the `image` crate into one of the supported encodings.
///
/// 16-bit direct color is narrowed to 8 bits per channel first.
pub fn from_dynamic(img: DynamicImage) -> Result<NativeImage> {
    let (width, height) = img.dimensions();
    let img = match img {
        DynamicImage::ImageRgb16(_) => DynamicImage::ImageRgb8(img.to_rgb8()),
        DynamicImage::ImageRgba16(_) => DynamicImage::ImageRgba8(img.to_rgba8()),
        other => other,
    };
    let encoding = match img {
        DynamicImage::ImageRgb8(buf) => PixelEncoding::Rgb(
            buf.into_raw()
                .chunks_exact(3)
                .map(|c| RGB8::new(c[0], c[1], c[2]))
                .collect(),
        ),
        DynamicImage::ImageRgba8(buf) => PixelEncoding::Rgba(
            buf.into_raw()
                .chunks_exact(4)
                .map(|c| RGBA8::new(c[0], c[1], c[2], c[3]))
                .collect(),
        ),
        other => {
            return Err(AnalysisError::UnsupportedFormat(format!(
                "{:?}",
                other.color()
            )));
        }
    };

    Ok(NativeImage {
        width,
        height,
        encoding,
    })
}

/// Returns `Ok(None)` when the PNG is not palette-based.
fn decode_indexed_png(path: &Path, bytes: &[u8]) -> Result<Option<NativeImage>> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder
        .read_info()
        .map_err(|e| AnalysisError::decode(path, e))?;

    let info = reader.info();
    if info.color_type != png::ColorType::Indexed {
        return Ok(None);
    }

    let plte = info
        .palette
        .as_deref()
        .ok_or_else(|| AnalysisError::decode(path, "indexed PNG has no PLTE chunk"))?;
    let trns = info.trns.as_deref();
    let palette: Vec<RGBA8> = plte
        .chunks_exact(3)
        .enumerate()
        .map(|(i, c)| {
            let alpha = trns.and_then(|t| t.get(i)).copied().unwrap_or(255);
            RGBA8::new(c[0], c[1], c[2], alpha)
        })
        .collect();

    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buf)
        .map_err(|e| AnalysisError::decode(path, e))?;

    let bits = frame.bit_depth as u8 as usize;
    if !matches!(bits, 1 | 2 | 4 | 8) {
        return Err(AnalysisError::decode(
            path,
            format!("invalid bit depth {} for indexed PNG", bits),
        ));
    }

    let indices = unpack_indices(
        &buf,
        frame.width as usize,
        frame.height as usize,
        frame.line_size,
        bits,
    )
    .ok_or_else(|| AnalysisError::decode(path, "truncated image data"))?;

    Ok(Some(NativeImage {
        width: frame.width,
        height: frame.height,
        encoding: PixelEncoding::Indexed { palette, indices },
    }))
}

/// Expand packed sub-byte palette indices (most significant bits first) into one byte each.
pub fn unpack_indices(
    buf: &[u8],
    width: usize,
    height: usize,
    line_size: usize,
    bits: usize,
) -> Option<Vec<u8>> {
    if line_size == 0 || buf.len() < line_size * height {
        return None;
    }

    let per_byte = 8 / bits;
    let mask = ((1u16 << bits) - 1) as u8;
    let mut indices = Vec::with_capacity(width * height);

    for row in buf.chunks_exact(line_size).take(height) {
        if bits == 8 {
            indices.extend_from_slice(row.get(..width)?);
            continue;
        }
        for x in 0..width {
            let byte = *row.get(x / per_byte)?;
            let shift = 8 - bits * (x % per_byte + 1);
            indices.push((byte >> shift) & mask);
        }
    }

    Some(indices)
}

/// Drop alpha by compositing onto [`BACKDROP`], rounding to nearest.
pub fn flatten_alpha(color: RGBA8) -> Pixel {
    let a = color.a as u32;
    let blend = |fg: u8, bg: u8| ((fg as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8;
    RGB8::new(
        blend(color.r, BACKDROP.r),
        blend(color.g, BACKDROP.g),
        blend(color.b, BACKDROP.b),
    )
}

/// Look every index up in the palette, keeping alpha.
pub fn resolve_palette(palette: &[RGBA8], indices: &[u8]) -> Result<Vec<RGBA8>> {
    indices
        .iter()
        .map(|&i| {
            palette.get(i as usize).copied().ok_or_else(|| {
                AnalysisError::DecodeError(format!(
                    "palette index {} out of range (palette has {} entries)",
                    i,
                    palette.len()
                ))
            })
        })
        .collect()
}

/// Convert a decoded image into canonical 3-channel pixels.
///
/// Takes the native image by value so its buffer is released as soon as the
/// canonical one exists.
pub fn canonicalize(image: NativeImage) -> Result<ImageData> {
    let expected = image.pixel_count();
    let pixels: Vec<Pixel> = match image.encoding {
        PixelEncoding::Indexed { palette, indices } => resolve_palette(&palette, &indices)?
            .into_iter()
            .map(flatten_alpha)
            .collect(),
        PixelEncoding::Rgba(rgba) => rgba.into_iter().map(flatten_alpha).collect(),
        PixelEncoding::Rgb(rgb) => rgb,
    };

    if pixels.len() != expected {
        return Err(AnalysisError::DecodeError(format!(
            "expected {} pixels for a {}x{} image, found {}",
            expected,
            image.width,
            image.height,
            pixels.len()
        )));
    }

    Ok(ImageData {
        width: image.width,
        height: image.height,
        pixels,
    })
}
