use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage};
use std::path::Path;

/// Flattens alpha onto white, converts to luma and stretches contrast so
/// faint scans reach the full range before recognition.
pub(super) fn normalize_page(input: &Path, output: &Path) -> Result<()> {
    let image = image::open(input)
        .with_context(|| format!("failed to decode rendered page: {}", input.display()))?;
    let prepared = contrast_stretch(&flatten_to_luma(image));
    prepared
        .save_with_format(output, image::ImageFormat::Png)
        .with_context(|| format!("failed to write prepared page: {}", output.display()))?;
    Ok(())
}

fn flatten_to_luma(image: DynamicImage) -> GrayImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut luma = GrayImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let r = r as f32 * alpha + 255.0 * (1.0 - alpha);
        let g = g as f32 * alpha + 255.0 * (1.0 - alpha);
        let b = b as f32 * alpha + 255.0 * (1.0 - alpha);
        let value = (0.299 * r + 0.587 * g + 0.114 * b).round() as u8;
        luma.put_pixel(x, y, image::Luma([value]));
    }
    luma
}

fn contrast_stretch(image: &GrayImage) -> GrayImage {
    let mut min = 255u8;
    let mut max = 0u8;
    for pixel in image.pixels() {
        min = min.min(pixel[0]);
        max = max.max(pixel[0]);
    }
    if max <= min {
        return image.clone();
    }

    let scale = 255.0 / (max as f32 - min as f32);
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        pixel[0] = (pixel[0].saturating_sub(min) as f32 * scale).round() as u8;
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stretches_narrow_range_to_full_scale() {
        let mut image = GrayImage::new(2, 1);
        image.put_pixel(0, 0, image::Luma([100]));
        image.put_pixel(1, 0, image::Luma([150]));
        let out = contrast_stretch(&image);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn transparent_pixels_become_white() {
        let image = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba([0, 0, 0, 0]),
        ));
        assert_eq!(flatten_to_luma(image).get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn writes_prepared_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("page-001.png");
        let output = dir.path().join("page-001.ocr.png");
        image::RgbImage::from_pixel(3, 2, image::Rgb([200, 10, 10]))
            .save(&input)
            .expect("save");
        normalize_page(&input, &output).expect("normalize");
        let prepared = image::open(&output).expect("open");
        assert_eq!((prepared.width(), prepared.height()), (3, 2));
    }
}
