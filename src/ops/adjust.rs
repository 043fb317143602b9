//! Tone and detail adjustments applied by the pipeline.
//!
//! Brightness and saturation take percentages, matching the usual image
//! optimizer query conventions: `0` leaves the image unchanged.

use image::{RgbaImage, imageops};
use palette::{Hsl, IntoColor, Srgb};

/// Applies a per-channel lookup table to the color channels, keeping alpha.
fn apply_lut(image: &RgbaImage, lut: &[u8; 256]) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        pixel.0 = [lut[r as usize], lut[g as usize], lut[b as usize], a];
    }
    out
}

fn build_lut(f: impl Fn(f64) -> f64) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = f(i as f64).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Gamma correction: each channel becomes `255 * (v / 255)^(1 / gamma)`.
///
/// Gamma values above 1 brighten, values below 1 darken.
pub fn gamma(image: &RgbaImage, gamma: f64) -> RgbaImage {
    let exponent = 1.0 / gamma.max(0.0001);
    let lut = build_lut(|v| (v / 255.0).powf(exponent) * 255.0);
    apply_lut(image, &lut)
}

/// Shifts every color channel by `percent` of full scale, clamped to `[-100, 100]`.
pub fn brightness(image: &RgbaImage, percent: f64) -> RgbaImage {
    let percent = percent.clamp(-100.0, 100.0);
    if percent == 0.0 {
        return image.clone();
    }
    let shift = 255.0 * percent / 100.0;
    let lut = build_lut(|v| v + shift);
    apply_lut(image, &lut)
}

/// Scales HSL saturation by `1 + percent / 100`, with `percent` clamped to `[-100, 500]`.
pub fn saturation(image: &RgbaImage, percent: f64) -> RgbaImage {
    let percent = percent.clamp(-100.0, 500.0);
    if percent == 0.0 {
        return image.clone();
    }
    let multiplier = (1.0 + percent / 100.0) as f32;

    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let rgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
        let mut hsl: Hsl = rgb.into_color();
        hsl.saturation = (hsl.saturation * multiplier).min(1.0);
        let adjusted: Srgb = hsl.into_color();
        pixel.0 = [
            (adjusted.red * 255.0).round().clamp(0.0, 255.0) as u8,
            (adjusted.green * 255.0).round().clamp(0.0, 255.0) as u8,
            (adjusted.blue * 255.0).round().clamp(0.0, 255.0) as u8,
            a,
        ];
    }
    out
}

/// Gaussian blur with the given standard deviation.
pub fn blur(image: &RgbaImage, sigma: f64) -> RgbaImage {
    imageops::blur(image, sigma as f32)
}

/// Unsharp-mask sharpening with the given blur sigma and no threshold.
pub fn sharpen(image: &RgbaImage, sigma: f64) -> RgbaImage {
    imageops::unsharpen(image, sigma as f32, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn gamma_one_is_identity() {
        let img = RgbaImage::from_fn(8, 8, |x, y| Rgba([(x * 30) as u8, (y * 30) as u8, 7, 200]));
        assert_eq!(gamma(&img, 1.0), img);
    }

    #[test]
    fn gamma_above_one_brightens_midtones() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([128, 128, 128, 255]));
        let out = gamma(&img, 2.2);
        assert!(out.get_pixel(0, 0)[0] > 128);
        assert_eq!(out.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn brightness_shifts_and_clamps() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([250, 100, 0, 10]));
        let out = brightness(&img, 10.0);
        assert_eq!(out.get_pixel(0, 0).0, [255, 126, 26, 10]);
        let out = brightness(&img, -100.0);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 10]);
    }

    #[test]
    fn full_desaturation_yields_gray() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([200, 40, 40, 255]));
        let out = saturation(&img, -100.0);
        let [r, g, b, a] = out.get_pixel(0, 0).0;
        assert!(r.abs_diff(g) <= 1 && g.abs_diff(b) <= 1);
        assert_eq!(a, 255);
    }

    #[test]
    fn blur_smooths_a_hard_edge() {
        let img = RgbaImage::from_fn(10, 1, |x, _| {
            if x < 5 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        });
        let out = blur(&img, 1.5);
        let edge = out.get_pixel(4, 0)[0];
        assert!(edge > 0 && edge < 255);
    }

    #[test]
    fn sharpen_keeps_dimensions() {
        let img = RgbaImage::from_pixel(12, 9, Rgba([90, 90, 90, 255]));
        assert_eq!(sharpen(&img, 1.0).dimensions(), (12, 9));
    }
}
