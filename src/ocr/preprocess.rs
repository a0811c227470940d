use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};

use crate::config::{OcrConfig, RelativeRect};

/// Crops a sub-region from an image using relative coordinates.
///
/// Converts the relative rect (0.0–1.0) to absolute pixel coordinates,
/// clamps to image bounds, and returns the cropped sub-image.
pub fn crop_region(img: &RgbaImage, region: &RelativeRect) -> RgbaImage {
    let (w, h) = img.dimensions();

    let x0 = ((region.x.max(0.0) * w as f32) as u32).min(w);
    let y0 = ((region.y.max(0.0) * h as f32) as u32).min(h);
    let rw = ((region.width.max(0.0) * w as f32) as u32).min(w - x0);
    let rh = ((region.height.max(0.0) * h as f32) as u32).min(h - y0);

    imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// Rec. 601 luma of an RGBA image.
pub fn to_luma(img: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y);
        let luma = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// Upscales by `factor`. Small glyphs read much better at 2x.
pub fn upscale(img: &GrayImage, factor: f32) -> GrayImage {
    if (factor - 1.0).abs() < f32::EPSILON || img.width() == 0 || img.height() == 0 {
        return img.clone();
    }
    let w = ((img.width() as f32 * factor).round() as u32).max(1);
    let h = ((img.height() as f32 * factor).round() as u32).max(1);
    imageops::resize(img, w, h, FilterType::CatmullRom)
}

/// Min/max contrast stretch to the full 0-255 range.
pub fn stretch_contrast(img: &GrayImage) -> GrayImage {
    let (min, max) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max <= min {
        return img.clone();
    }
    let range = (max - min) as f32;
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let v = img.get_pixel(x, y)[0];
        Luma([(((v - min) as f32 / range) * 255.0).round() as u8])
    })
}

/// Otsu's threshold: the level maximizing between-class variance.
pub fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for p in img.pixels() {
        histogram[p[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 128;
    }

    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut sum_bg = 0.0;
    let mut weight_bg = 0u64;
    let mut best_level = 0u8;
    let mut best_variance = -1.0;

    for (level, &count) in histogram.iter().enumerate() {
        weight_bg += count;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += level as f64 * count as f64;

        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let variance = weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }
    best_level
}

/// Pixels above `threshold` become white, the rest black.
pub fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let value = if img.get_pixel(x, y)[0] > threshold { 255 } else { 0 };
        Luma([value])
    })
}

/// Inverts a binary image when the background (majority) is black, so
/// tesseract always sees dark text on a light background.
pub fn normalize_polarity(img: GrayImage) -> GrayImage {
    let dark = img.pixels().filter(|p| p[0] < 128).count();
    if dark * 2 > (img.width() * img.height()) as usize {
        let mut inverted = img;
        imageops::invert(&mut inverted);
        inverted
    } else {
        img
    }
}

/// Full deterministic preprocessing for one region of one frame.
pub fn preprocess_region(frame: &RgbaImage, region: &RelativeRect, config: &OcrConfig) -> GrayImage {
    let cropped = crop_region(frame, region);
    let gray = to_luma(&cropped);
    let scaled = upscale(&gray, config.scale_factor);
    let stretched = stretch_contrast(&scaled);
    let threshold = config.threshold.unwrap_or_else(|| otsu_threshold(&stretched));
    normalize_polarity(binarize(&stretched, threshold))
}

/// Grayscale crop of a region, used for frame differencing.
pub fn region_luma(frame: &RgbaImage, region: &RelativeRect) -> GrayImage {
    to_luma(&crop_region(frame, region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_crop_region() {
        // 100x200 image
        let img = RgbaImage::from_fn(100, 200, |x, y| Rgba([x as u8, y as u8, 0, 255]));

        let region = RelativeRect::new(0.1, 0.25, 0.5, 0.1);
        let cropped = crop_region(&img, &region);

        assert_eq!(cropped.dimensions(), (50, 20));
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_crop_region_clamps() {
        let img = RgbaImage::new(100, 100);
        let region = RelativeRect::new(0.9, 0.9, 0.5, 0.5);
        let cropped = crop_region(&img, &region);

        assert_eq!(cropped.dimensions(), (10, 10));
    }

    #[test]
    fn test_stretch_contrast_uses_full_range() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([100 + x as u8 * 10]));
        let stretched = stretch_contrast(&img);
        assert_eq!(stretched.get_pixel(0, 0)[0], 0);
        assert_eq!(stretched.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn test_otsu_separates_two_levels() {
        let img = GrayImage::from_fn(10, 1, |x, _| Luma([if x < 5 { 40 } else { 200 }]));
        let t = otsu_threshold(&img);
        assert!((40..200).contains(&t), "threshold {} should split the levels", t);
    }

    #[test]
    fn test_light_text_on_dark_is_inverted() {
        // 8 dark background pixels, 2 bright text pixels
        let img = RgbaImage::from_fn(10, 1, |x, _| {
            if x < 2 { Rgba([250, 250, 250, 255]) } else { Rgba([20, 20, 20, 255]) }
        });
        let config = OcrConfig { scale_factor: 1.0, ..OcrConfig::default() };
        let out = preprocess_region(&img, &RelativeRect::FULL, &config);

        assert_eq!(out.get_pixel(0, 0)[0], 0, "text should be dark");
        assert_eq!(out.get_pixel(9, 0)[0], 255, "background should be light");
    }

    #[test]
    fn test_preprocess_scales_and_is_deterministic() {
        let img = RgbaImage::from_fn(20, 10, |x, y| Rgba([(x * 12) as u8, (y * 20) as u8, 90, 255]));
        let config = OcrConfig::default();
        let a = preprocess_region(&img, &RelativeRect::FULL, &config);
        let b = preprocess_region(&img, &RelativeRect::FULL, &config);
        assert_eq!(a.dimensions(), (40, 20));
        assert_eq!(a, b);
    }
}
