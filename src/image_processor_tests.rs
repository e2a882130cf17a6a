#[cfg(test)]
mod tests {
    use super::super::*;
    use rgb::{RGB8, RGBA8};
    use std::fs::File;
    use std::io::BufWriter;

    fn write_indexed_png(path: &Path, width: u32, height: u32, depth: png::BitDepth, data: &[u8]) {
        let file = File::create(path).unwrap();
        let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(depth);
        encoder.set_palette(vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 10, 20, 30]);
        encoder.set_trns(vec![255, 255, 0, 255]);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(data).unwrap();
    }

    #[test]
    fn test_flatten_alpha_opaque_unchanged() {
        let c = flatten_alpha(RGBA8::new(12, 200, 99, 255));
        assert_eq!(c, RGB8::new(12, 200, 99));
    }

    #[test]
    fn test_flatten_alpha_transparent_becomes_backdrop() {
        let c = flatten_alpha(RGBA8::new(250, 250, 250, 0));
        assert_eq!(c, BACKDROP);
    }

    #[test]
    fn test_flatten_alpha_half_transparent() {
        let c = flatten_alpha(RGBA8::new(255, 100, 0, 128));
        // 255 * 128 / 255 = 128, 100 * 128 / 255 = 50.2
        assert_eq!(c, RGB8::new(128, 50, 0));
    }

    #[test]
    fn test_resolve_palette_out_of_range() {
        let palette = vec![RGBA8::new(1, 2, 3, 255)];
        let result = resolve_palette(&palette, &[0, 1]);
        assert!(matches!(result, Err(AnalysisError::DecodeError(_))));
    }

    #[test]
    fn test_canonicalize_indexed_keeps_pixel_count() {
        let image = NativeImage {
            width: 3,
            height: 2,
            encoding: PixelEncoding::Indexed {
                palette: vec![RGBA8::new(255, 0, 0, 255), RGBA8::new(0, 0, 255, 0)],
                indices: vec![0, 1, 0, 1, 1, 0],
            },
        };

        let canonical = canonicalize(image).expect("indexed images are supported");
        assert_eq!(canonical.pixels.len(), 6);
        assert_eq!(canonical.pixels[0], RGB8::new(255, 0, 0));
        assert_eq!(canonical.pixels[1], BACKDROP);
    }

    #[test]
    fn test_canonicalize_rgb_passthrough() {
        let pixels = vec![RGB8::new(1, 2, 3), RGB8::new(4, 5, 6)];
        let image = NativeImage {
            width: 2,
            height: 1,
            encoding: PixelEncoding::Rgb(pixels.clone()),
        };
        let canonical = canonicalize(image).unwrap();
        assert_eq!(canonical.pixels, pixels);
        assert_eq!(canonical.width, 2);
        assert_eq!(canonical.height, 1);
    }

    #[test]
    fn test_canonicalize_rgba_drops_alpha() {
        let image = NativeImage {
            width: 1,
            height: 2,
            encoding: PixelEncoding::Rgba(vec![
                RGBA8::new(9, 8, 7, 255),
                RGBA8::new(9, 8, 7, 0),
            ]),
        };
        let canonical = canonicalize(image).unwrap();
        assert_eq!(canonical.pixels, vec![RGB8::new(9, 8, 7), RGB8::new(0, 0, 0)]);
    }

    #[test]
    fn test_canonicalize_rejects_size_mismatch() {
        let image = NativeImage {
            width: 2,
            height: 2,
            encoding: PixelEncoding::Rgb(vec![RGB8::new(0, 0, 0); 3]),
        };
        assert!(matches!(
            canonicalize(image),
            Err(AnalysisError::DecodeError(_))
        ));
    }

    #[test]
    fn test_from_dynamic_rejects_grayscale() {
        let gray = image::GrayImage::from_pixel(4, 4, image::Luma([42]));
        let result = from_dynamic(DynamicImage::ImageLuma8(gray));
        assert!(matches!(result, Err(AnalysisError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_from_dynamic_narrows_sixteen_bit_rgb() {
        let rgb16: image::ImageBuffer<image::Rgb<u16>, Vec<u16>> =
            image::ImageBuffer::from_pixel(4, 4, image::Rgb([65535, 0, 32896]));
        let native = from_dynamic(DynamicImage::ImageRgb16(rgb16)).unwrap();
        assert_eq!(
            native.encoding,
            PixelEncoding::Rgb(vec![RGB8::new(255, 0, 128); 16])
        );
    }

    #[test]
    fn test_from_dynamic_narrows_sixteen_bit_rgba() {
        let rgba16: image::ImageBuffer<image::Rgba<u16>, Vec<u16>> =
            image::ImageBuffer::from_pixel(2, 3, image::Rgba([65535, 65535, 0, 0]));
        let native = from_dynamic(DynamicImage::ImageRgba16(rgba16)).unwrap();
        assert_eq!(native.pixel_count(), 6);
        assert_eq!(
            native.encoding,
            PixelEncoding::Rgba(vec![RGBA8::new(255, 255, 0, 0); 6])
        );
    }

    #[test]
    fn test_load_sixteen_bit_png() {
        let dir = tempfile::tempdir().unwrap();
        let rgb_path = dir.path().join("rgb16.png");
        let rgba_path = dir.path().join("rgba16.png");
        let rgb16: image::ImageBuffer<image::Rgb<u16>, Vec<u16>> =
            image::ImageBuffer::from_pixel(4, 4, image::Rgb([0, 65535, 0]));
        let rgba16: image::ImageBuffer<image::Rgba<u16>, Vec<u16>> =
            image::ImageBuffer::from_pixel(4, 4, image::Rgba([0, 0, 65535, 65535]));
        rgb16.save(&rgb_path).unwrap();
        rgba16.save(&rgba_path).unwrap();

        let rgb = canonicalize(load_image(&rgb_path).unwrap()).unwrap();
        assert_eq!(rgb.pixels, vec![RGB8::new(0, 255, 0); 16]);
        let rgba = canonicalize(load_image(&rgba_path).unwrap()).unwrap();
        assert_eq!(rgba.pixels, vec![RGB8::new(0, 0, 255); 16]);
    }

    #[test]
    fn test_from_dynamic_rejects_float() {
        let float = image::Rgb32FImage::from_pixel(2, 2, image::Rgb([0.5, 0.5, 0.5]));
        let result = from_dynamic(DynamicImage::ImageRgb32F(float));
        assert!(matches!(result, Err(AnalysisError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_from_dynamic_rgb() {
        let rgb = image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
        let native = from_dynamic(DynamicImage::ImageRgb8(rgb)).unwrap();
        assert_eq!(native.pixel_count(), 6);
        assert_eq!(
            native.encoding,
            PixelEncoding::Rgb(vec![RGB8::new(10, 20, 30); 6])
        );
    }

    #[test]
    fn test_unpack_indices_one_bit() {
        // 10 pixels per row, 2 bytes per row
        let buf = [0b1010_0000, 0b1100_0000, 0b0000_0001, 0b0100_0000];
        let indices = unpack_indices(&buf, 10, 2, 2, 1).unwrap();
        assert_eq!(indices.len(), 20);
        assert_eq!(&indices[..10], &[1, 0, 1, 0, 0, 0, 0, 0, 1, 1]);
        assert_eq!(&indices[10..], &[0, 0, 0, 0, 0, 0, 0, 1, 0, 1]);
    }

    #[test]
    fn test_unpack_indices_four_bit() {
        let buf = [0x12, 0x30];
        let indices = unpack_indices(&buf, 3, 1, 2, 4).unwrap();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_unpack_indices_truncated() {
        assert!(unpack_indices(&[0x00], 4, 2, 1, 2).is_none());
    }

    #[test]
    fn test_load_image_missing_file() {
        let result = load_image(Path::new("/definitely/not/here.png"));
        assert!(matches!(result, Err(AnalysisError::FileNotFound { .. })));
    }

    #[test]
    fn test_load_image_corrupt_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really a png").unwrap();
        assert!(matches!(
            load_image(&path),
            Err(AnalysisError::DecodeError(_))
        ));
    }

    #[test]
    fn test_load_indexed_png_keeps_palette() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("indexed.png");
        write_indexed_png(&path, 2, 2, png::BitDepth::Eight, &[0, 1, 2, 3]);

        let native = load_image(&path).unwrap();
        match &native.encoding {
            PixelEncoding::Indexed { palette, indices } => {
                assert_eq!(palette.len(), 4);
                assert_eq!(palette[2], RGBA8::new(0, 0, 255, 0));
                assert_eq!(indices, &vec![0, 1, 2, 3]);
            }
            other => panic!("expected indexed encoding, got {:?}", other),
        }

        let canonical = canonicalize(native).unwrap();
        assert_eq!(
            canonical.pixels,
            vec![
                RGB8::new(255, 0, 0),
                RGB8::new(0, 255, 0),
                BACKDROP,
                RGB8::new(10, 20, 30),
            ]
        );
    }

    #[test]
    fn test_load_packed_indexed_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packed.png");
        // 3x2 at 2 bits per pixel: one byte per row
        write_indexed_png(&path, 3, 2, png::BitDepth::Two, &[0b0001_1000, 0b1101_0000]);

        let canonical = canonicalize(load_image(&path).unwrap()).unwrap();
        assert_eq!(canonical.pixels.len(), 6);
        assert_eq!(canonical.pixels[0], RGB8::new(255, 0, 0));
        assert_eq!(canonical.pixels[1], RGB8::new(0, 255, 0));
        assert_eq!(canonical.pixels[2], BACKDROP);
        assert_eq!(canonical.pixels[3], RGB8::new(10, 20, 30));
        assert_eq!(canonical.pixels[4], RGB8::new(0, 255, 0));
        assert_eq!(canonical.pixels[5], RGB8::new(255, 0, 0));
    }
}
