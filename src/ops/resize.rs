//! Resampling and box-fitting.
//!
//! Dimension math lives in small pure functions so it can be tested without
//! touching pixels; the image functions all resample with Lanczos3.

use image::RgbaImage;
use image::imageops::{self, FilterType};

const FILTER: FilterType = FilterType::Lanczos3;

/// Largest size with the given aspect ratio that fits inside `target`.
///
/// Never returns a zero dimension.
pub fn fit_dimensions(aspect: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (aspect.0.max(1) as f64, aspect.1.max(1) as f64);
    let (tgt_w, tgt_h) = (target.0 as f64, target.1 as f64);

    let ratio = (tgt_w / src_w).min(tgt_h / src_h);
    let w = (src_w * ratio).round().max(1.0) as u32;
    let h = (src_h * ratio).round().max(1.0) as u32;
    (w, h)
}

/// Smallest size with the given aspect ratio that covers `target`.
///
/// One dimension matches the target exactly, the other may exceed it.
pub fn fill_dimensions(aspect: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (aspect.0.max(1) as f64, aspect.1.max(1) as f64);
    let (tgt_w, tgt_h) = (target.0.max(1), target.1.max(1));

    let src_aspect = src_w / src_h;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        let w = (tgt_h as f64 * src_aspect).round() as u32;
        (w.max(tgt_w), tgt_h)
    } else {
        let h = (tgt_w as f64 / src_aspect).round() as u32;
        (tgt_w, h.max(tgt_h))
    }
}

/// Fills in a zero axis of `target` from the aspect ratio of `current`.
///
/// When both axes are zero the current size is kept.
pub fn derive_missing_dimension(current: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (cur_w, cur_h) = (current.0.max(1) as f64, current.1.max(1) as f64);
    match target {
        (0, 0) => current,
        (w, 0) => (w, (w as f64 * cur_h / cur_w).round().max(1.0) as u32),
        (0, h) => ((h as f64 * cur_w / cur_h).round().max(1.0) as u32, h),
        both => both,
    }
}

/// Resamples to exactly `width` x `height`, ignoring aspect ratio.
pub fn resize_exact(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let (width, height) = (width.max(1), height.max(1));
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FILTER)
}

/// Resamples so the result fits inside `target` with the given aspect ratio.
pub fn fit(image: &RgbaImage, aspect: (u32, u32), target: (u32, u32)) -> RgbaImage {
    let (w, h) = fit_dimensions(aspect, target);
    resize_exact(image, w, h)
}

/// Resamples to cover `target` with the given aspect ratio, then crops the center.
pub fn fill(image: &RgbaImage, aspect: (u32, u32), target: (u32, u32)) -> RgbaImage {
    let (tgt_w, tgt_h) = (target.0.max(1), target.1.max(1));
    let (w, h) = fill_dimensions(aspect, (tgt_w, tgt_h));
    let covered = resize_exact(image, w, h);

    let x = (w - tgt_w) / 2;
    let y = (h - tgt_h) / 2;
    imageops::crop_imm(&covered, x, y, tgt_w, tgt_h).to_image()
}

/// `current` scaled by `factor`, truncated and kept at least one pixel.
///
/// Results past `u32::MAX` saturate.
pub fn scaled_dimensions(current: (u32, u32), factor: f64) -> (u32, u32) {
    let w = (current.0 as f64 * factor) as u32;
    let h = (current.1 as f64 * factor) as u32;
    (w.max(1), h.max(1))
}

/// Scales both dimensions by `factor`, truncating and keeping at least one pixel.
pub fn scale(image: &RgbaImage, factor: f64) -> RgbaImage {
    let (w, h) = scaled_dimensions(image.dimensions(), factor);
    resize_exact(image, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn fit_landscape_into_square() {
        assert_eq!(fit_dimensions((400, 300), (100, 100)), (100, 75));
        assert_eq!(fit_dimensions((300, 400), (100, 100)), (75, 100));
    }

    #[test]
    fn fit_scales_up_small_sources() {
        assert_eq!(fit_dimensions((40, 30), (100, 100)), (100, 75));
    }

    #[test]
    fn fill_covers_target() {
        assert_eq!(fill_dimensions((400, 300), (100, 100)), (133, 100));
        assert_eq!(fill_dimensions((300, 400), (100, 100)), (100, 133));
        assert_eq!(fill_dimensions((100, 100), (100, 50)), (100, 100));
    }

    #[test]
    fn missing_dimension_follows_aspect() {
        assert_eq!(derive_missing_dimension((400, 300), (200, 0)), (200, 150));
        assert_eq!(derive_missing_dimension((400, 300), (0, 150)), (200, 150));
        assert_eq!(derive_missing_dimension((400, 300), (0, 0)), (400, 300));
        assert_eq!(derive_missing_dimension((400, 300), (10, 10)), (10, 10));
    }

    #[test]
    fn fill_crops_to_exact_target() {
        let img = RgbaImage::from_pixel(400, 300, Rgba([10, 20, 30, 255]));
        let out = fill(&img, (400, 300), (100, 100));
        assert_eq!(out.dimensions(), (100, 100));
    }

    #[test]
    fn scale_truncates_and_keeps_one_pixel() {
        let img = RgbaImage::from_pixel(15, 10, Rgba([0, 0, 0, 255]));
        assert_eq!(scale(&img, 1.5).dimensions(), (22, 15));
        assert_eq!(scale(&img, 0.01).dimensions(), (1, 1));
    }

    #[test]
    fn scaled_dimensions_saturate_instead_of_wrapping() {
        assert_eq!(scaled_dimensions((5, 3), 1.5), (7, 4));
        assert_eq!(scaled_dimensions((5, 3), 0.01), (1, 1));
        assert_eq!(scaled_dimensions((10, 10), 1e10), (u32::MAX, u32::MAX));
    }
}
