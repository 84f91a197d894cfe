//! Image operations of the thumbnail pipeline.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageResult, RgbaImage};

use super::config::{DISCLAIMER_OFFSET, DISCLAIMER_OPACITY};

const FILTER: FilterType = FilterType::Lanczos3;

/// Scale to the requested box.
///
/// One positive side scales proportionally to it; two positive sides cover
/// the box and crop the overflow around the centre; `0x0` keeps the image.
pub(crate) fn resize(img: DynamicImage, width: u32, height: u32) -> DynamicImage {
    match (width, height) {
        (0, 0) => img,
        (w, 0) => img.resize(w, u32::MAX, FILTER),
        (0, h) => img.resize(u32::MAX, h, FILTER),
        (w, h) => img.resize_to_fill(w, h, FILTER),
    }
}

/// Multiply every alpha value by `opacity`.
pub(crate) fn fade(img: &mut RgbaImage, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    for pixel in img.pixels_mut() {
        pixel.0[3] = (f32::from(pixel.0[3]) * opacity).round() as u8;
    }
}

/// Composite `mark` over the centre of `base`, scaled to its size.
pub(crate) fn apply_watermark(base: &mut RgbaImage, mark: &DynamicImage, opacity: f32) {
    let (bw, bh) = base.dimensions();
    let mut mark = if mark.width() != bw || mark.height() != bh {
        mark.resize_exact(bw, bh, FILTER).into_rgba8()
    } else {
        mark.to_rgba8()
    };
    fade(&mut mark, opacity);
    let x = (i64::from(bw) - i64::from(mark.width())) / 2;
    let y = (i64::from(bh) - i64::from(mark.height())) / 2;
    imageops::overlay(base, &mark, x, y);
}

/// Composite `mark` at a tenth of the size of `base`, near its top-right corner.
pub(crate) fn apply_disclaimer(base: &mut RgbaImage, mark: &DynamicImage) {
    let (bw, bh) = base.dimensions();
    let (dw, dh) = ((bw / 10).max(1), (bh / 10).max(1));
    let mut mark = mark.resize_exact(dw, dh, FILTER).into_rgba8();
    fade(&mut mark, DISCLAIMER_OPACITY);
    let x = i64::from(bw) - i64::from(dw) - i64::from(DISCLAIMER_OFFSET);
    let y = i64::from(DISCLAIMER_OFFSET);
    imageops::overlay(base, &mark, x, y);
}

/// Encode `img` without metadata.
///
/// `quality` (1 to 100) is honoured by JPEG; other formats use their default
/// encoder settings.
pub(crate) fn encode(img: &DynamicImage, format: ImageFormat, quality: u8) -> ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
        }
        _ => img.write_to(&mut Cursor::new(&mut buf), format)?,
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    fn solid(w: u32, h: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(color)))
    }

    #[test]
    fn resize_modes() {
        let img = solid(400, 200, [255, 0, 0, 255]);
        assert_eq!(resize(img.clone(), 0, 0).dimensions(), (400, 200));
        assert_eq!(resize(img.clone(), 100, 0).dimensions(), (100, 50));
        assert_eq!(resize(img.clone(), 0, 50).dimensions(), (100, 50));
        assert_eq!(resize(img, 50, 100).dimensions(), (50, 100));
    }

    #[test]
    fn fade_scales_alpha() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 200]));
        fade(&mut img, 0.5);
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 100]);
    }

    #[test]
    fn watermark_blends_whole_image() {
        let mut base = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        let mark = solid(5, 5, [255, 255, 255, 255]);
        apply_watermark(&mut base, &mark, 1.0);
        assert!(base.get_pixel(0, 0).0[0] > 200);
        assert!(base.get_pixel(19, 19).0[0] > 200);
    }

    #[test]
    fn transparent_watermark_changes_nothing() {
        let mut base = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let mark = solid(4, 4, [255, 255, 255, 255]);
        apply_watermark(&mut base, &mark, 0.0);
        assert_eq!(base.get_pixel(2, 2).0, [0, 0, 0, 255]);
    }

    #[test]
    fn disclaimer_sits_top_right() {
        let mut base = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 255]));
        let mark = solid(50, 50, [255, 255, 255, 255]);
        apply_disclaimer(&mut base, &mark);
        // 20x10 overlay at x = 170..190, y = 10..20.
        assert_ne!(base.get_pixel(175, 15).0, [0, 0, 0, 255]);
        assert_eq!(base.get_pixel(5, 15).0, [0, 0, 0, 255]);
        assert_eq!(base.get_pixel(195, 15).0, [0, 0, 0, 255]);
    }

    #[test]
    fn encode_round_trips_dimensions() {
        let img = solid(8, 6, [1, 2, 3, 255]);
        for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Gif, ImageFormat::Bmp] {
            let bytes = encode(&img, format, 80).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (8, 6), "{format:?}");
        }
    }
}
