//! Canonical grayscale rendering of an upload for the image channel.
//!
//! luminance → histogram equalization → min-max stretch → 3×3 box blur,
//! re-encoded in the uploaded format.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, imageops};
use thiserror::Error;
use tracing::debug;

use crate::models::ImageMime;

const BOX_KERNEL: [f32; 9] = [1.0 / 9.0; 9];

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("not a valid image: {0}")]
    Decode(String),

    #[error("failed to encode normalized image: {0}")]
    Encode(String),

    #[error("normalization worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub mime: ImageMime,
}

/// Run [`normalize_image`] on the blocking pool.
pub async fn normalize_image_blocking(
    bytes: Vec<u8>,
    mime: ImageMime,
) -> Result<NormalizedImage, NormalizeError> {
    tokio::task::spawn_blocking(move || normalize_image(&bytes, mime))
        .await
        .map_err(|e| NormalizeError::Worker(e.to_string()))?
}

pub fn normalize_image(bytes: &[u8], mime: ImageMime) -> Result<NormalizedImage, NormalizeError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| NormalizeError::Decode(e.to_string()))?;

    let mut gray = decoded.to_luma8();
    equalize_histogram(&mut gray);
    stretch_min_max(&mut gray);
    let smoothed: GrayImage = imageops::filter3x3(&gray, &BOX_KERNEL);

    let mut encoded = Vec::new();
    DynamicImage::ImageLuma8(smoothed)
        .write_to(&mut Cursor::new(&mut encoded), mime.image_format())
        .map_err(|e| NormalizeError::Encode(e.to_string()))?;

    debug!(
        width = gray.width(),
        height = gray.height(),
        input_bytes = bytes.len(),
        output_bytes = encoded.len(),
        mime = mime.as_str(),
        "Normalized image"
    );

    Ok(NormalizedImage {
        bytes: encoded,
        mime,
    })
}

/// Classic CDF remap: the lowest occupied level goes to 0, the highest to 255.
/// Single-level images are left untouched.
pub fn equalize_histogram(image: &mut GrayImage) {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    let mut cdf = [0u64; 256];
    let mut running = 0u64;
    for (level, count) in histogram.iter().enumerate() {
        running += count;
        cdf[level] = running;
    }

    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    if total == cdf_min {
        return;
    }

    let span = (total - cdf_min) as f64;
    let mut lut = [0u8; 256];
    for (level, value) in lut.iter_mut().enumerate() {
        let shifted = cdf[level].saturating_sub(cdf_min) as f64;
        *value = (shifted * 255.0 / span).round().clamp(0.0, 255.0) as u8;
    }

    for pixel in image.pixels_mut() {
        pixel.0[0] = lut[pixel.0[0] as usize];
    }
}

/// Linear stretch of the occupied range onto `[0, 255]`.
pub fn stretch_min_max(image: &mut GrayImage) {
    let (min, max) = image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));
    if max <= min {
        return;
    }

    let scale = 255.0 / f32::from(max - min);
    for pixel in image.pixels_mut() {
        let v = f32::from(pixel.0[0] - min) * scale;
        pixel.0[0] = v.round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn encoded_gradient(format: image::ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(32, 16, |x, _| {
            let v = 60 + (x as u8) * 2;
            Rgb([v, v, v])
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), format)
            .unwrap();
        out
    }

    #[test]
    fn test_equalization_spreads_a_narrow_range() {
        let mut img = GrayImage::from_fn(4, 1, |x, _| Luma([100 + x as u8]));
        equalize_histogram(&mut img);

        let values: Vec<u8> = img.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 85, 170, 255]);
    }

    #[test]
    fn test_flat_images_are_left_alone() {
        let mut img = GrayImage::from_pixel(3, 3, Luma([42]));
        equalize_histogram(&mut img);
        stretch_min_max(&mut img);
        assert!(img.pixels().all(|p| p.0[0] == 42));
    }

    #[test]
    fn test_stretch_maps_extremes_to_full_range() {
        let levels = [10u8, 30, 112];
        let mut img = GrayImage::from_fn(3, 1, |x, _| Luma([levels[x as usize]]));
        stretch_min_max(&mut img);

        let values: Vec<u8> = img.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 50, 255]);
    }

    #[test]
    fn test_png_upload_comes_back_as_grayscale_png() {
        let bytes = encoded_gradient(image::ImageFormat::Png);
        let normalized = normalize_image(&bytes, ImageMime::Png).unwrap();

        assert_eq!(normalized.mime, ImageMime::Png);
        assert_eq!(
            image::guess_format(&normalized.bytes).unwrap(),
            image::ImageFormat::Png
        );
        let decoded = image::load_from_memory(&normalized.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_jpeg_upload_is_reencoded_as_jpeg() {
        let bytes = encoded_gradient(image::ImageFormat::Png);
        let normalized = normalize_image(&bytes, ImageMime::Jpeg).unwrap();

        assert_eq!(
            image::guess_format(&normalized.bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let bytes = encoded_gradient(image::ImageFormat::Png);
        let first = normalize_image(&bytes, ImageMime::Png).unwrap();
        let second = normalize_image(&bytes, ImageMime::Png).unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = normalize_image(b"definitely not an image", ImageMime::Jpeg).unwrap_err();
        assert!(matches!(err, NormalizeError::Decode(_)));
    }
}
