//! RGB/HSL conversion and whole-image hue rotation.

use image::RgbaImage;

/// Converts 8-bit RGB to HSL, each component in `[0, 1]`.
///
/// Achromatic colors (all channels equal) report hue and saturation 0.
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let rf = r as f64 / 255.0;
    let gf = g as f64 / 255.0;
    let bf = b as f64 / 255.0;
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let l = (max + min) / 2.0;

    if max == min {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if max == rf {
        let h = (gf - bf) / d;
        if g < b { h + 6.0 } else { h }
    } else if max == gf {
        (bf - rf) / d + 2.0
    } else {
        (rf - gf) / d + 4.0
    };

    (h / 6.0, s, l)
}

/// Converts HSL (each in `[0, 1]`) back to 8-bit RGB, rounding to nearest.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_rgb(p, q, h + 1.0 / 3.0),
            hue_to_rgb(p, q, h),
            hue_to_rgb(p, q, h - 1.0 / 3.0),
        )
    };

    (to_channel(r), to_channel(g), to_channel(b))
}

/// Resolves one RGB channel from the HSL intermediates `p` and `q`.
///
/// `t` may sit at most one unit outside `[0, 1]`.
pub fn hue_to_rgb(p: f64, q: f64, t: f64) -> f64 {
    let t = if t < 0.0 {
        t + 1.0
    } else if t > 1.0 {
        t - 1.0
    } else {
        t
    };

    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Rotates the hue of every pixel by `delta_degrees`, keeping alpha.
///
/// Any delta is accepted; the shifted hue is wrapped back into `[0, 1)`.
/// Returns a new image; the source is left untouched.
pub fn adjust_hue(image: &RgbaImage, delta_degrees: f64) -> RgbaImage {
    let delta = delta_degrees / 360.0;
    let mut out = RgbaImage::new(image.width(), image.height());

    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        let [r, g, b, a] = src.0;
        let (h, s, l) = rgb_to_hsl(r, g, b);
        let h = (h + delta).rem_euclid(1.0);
        let (nr, ng, nb) = hsl_to_rgb(h, s, l);
        dst.0 = [nr, ng, nb, a];
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn close(a: u8, b: u8) -> bool {
        (a as i16 - b as i16).abs() <= 1
    }

    fn assert_pixels_close(a: &RgbaImage, b: &RgbaImage) {
        assert_eq!(a.dimensions(), b.dimensions());
        for (pa, pb) in a.pixels().zip(b.pixels()) {
            for c in 0..4 {
                assert!(close(pa[c], pb[c]), "{:?} vs {:?}", pa, pb);
            }
        }
    }

    fn gradient() -> RgbaImage {
        RgbaImage::from_fn(16, 16, |x, y| {
            Rgba([(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8, (255 - x * 4) as u8])
        })
    }

    #[test]
    fn primaries_have_expected_hues() {
        let (h, s, l) = rgb_to_hsl(255, 0, 0);
        assert_eq!((h, s, l), (0.0, 1.0, 0.5));
        let (h, _, _) = rgb_to_hsl(0, 255, 0);
        assert!((h - 1.0 / 3.0).abs() < 1e-9);
        let (h, _, _) = rgb_to_hsl(0, 0, 255);
        assert!((h - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn achromatic_has_zero_hue_and_saturation() {
        let (h, s, l) = rgb_to_hsl(128, 128, 128);
        assert_eq!(h, 0.0);
        assert_eq!(s, 0.0);
        assert!((l - 128.0 / 255.0).abs() < 1e-9);
        assert_eq!(hsl_to_rgb(0.7, 0.0, l), (128, 128, 128));
    }

    #[test]
    fn hsl_round_trip_within_one() {
        for r in (0..=255u16).step_by(17) {
            for g in (0..=255u16).step_by(17) {
                for b in (0..=255u16).step_by(51) {
                    let (h, s, l) = rgb_to_hsl(r as u8, g as u8, b as u8);
                    let (nr, ng, nb) = hsl_to_rgb(h, s, l);
                    assert!(close(nr, r as u8) && close(ng, g as u8) && close(nb, b as u8));
                }
            }
        }
    }

    #[test]
    fn zero_rotation_is_identity() {
        let img = gradient();
        assert_pixels_close(&adjust_hue(&img, 0.0), &img);
    }

    #[test]
    fn full_turn_is_identity() {
        let img = gradient();
        assert_pixels_close(&adjust_hue(&img, 360.0), &img);
        assert_pixels_close(&adjust_hue(&img, -720.0), &img);
    }

    #[test]
    fn rotation_by_120_maps_red_to_green() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 77]));
        let rotated = adjust_hue(&img, 120.0);
        assert_eq!(rotated.get_pixel(1, 1).0, [0, 255, 0, 77]);
    }

    #[test]
    fn large_negative_delta_wraps() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        let a = adjust_hue(&img, -240.0);
        let b = adjust_hue(&img, 120.0);
        assert_pixels_close(&a, &b);
        let c = adjust_hue(&img, 480.0);
        assert_pixels_close(&c, &b);
    }
}
