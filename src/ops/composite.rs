//! Compositing of one image over another.

use image::{Rgba, RgbaImage};

/// Offset that centers a `top`-sized box inside a `base`-sized box.
pub fn center_offset(base: (u32, u32), top: (u32, u32)) -> (i64, i64) {
    (
        base.0 as i64 / 2 - top.0 as i64 / 2,
        base.1 as i64 / 2 - top.1 as i64 / 2,
    )
}

/// Blends `top` onto a copy of `base` at `(x, y)` with the given opacity.
///
/// `opacity` scales the alpha of every `top` pixel before a source-over
/// blend; pixels falling outside `base` are skipped.
pub fn overlay(base: &RgbaImage, top: &RgbaImage, x: i64, y: i64, opacity: f32) -> RgbaImage {
    let mut out = base.clone();
    composite_over(&mut out, top, x, y, opacity);
    out
}

/// [`overlay`] with `top` centered on `base`.
pub fn overlay_center(base: &RgbaImage, top: &RgbaImage, opacity: f32) -> RgbaImage {
    let (x, y) = center_offset(base.dimensions(), top.dimensions());
    overlay(base, top, x, y, opacity)
}

/// Copies `top` into the center of a copy of `base`, replacing pixels.
pub fn paste_center(base: &RgbaImage, top: &RgbaImage) -> RgbaImage {
    let mut out = base.clone();
    let (x, y) = center_offset(base.dimensions(), top.dimensions());
    image::imageops::replace(&mut out, top, x, y);
    out
}

/// Covers the whole image with a uniform color at the given opacity.
pub fn tint(image: &RgbaImage, color: Rgba<u8>, opacity: f32) -> RgbaImage {
    let layer = RgbaImage::from_pixel(image.width(), image.height(), color);
    overlay(image, &layer, 0, 0, opacity)
}

/// Blends `src` onto `dest` in place at `(x, y)`.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    let dest_width = dest.width() as i64;
    let dest_height = dest.height() as i64;

    for (sx, sy, src_pixel) in src.enumerate_pixels() {
        let dx = x + sx as i64;
        let dy = y + sy as i64;
        if dx < 0 || dy < 0 || dx >= dest_width || dy >= dest_height {
            continue;
        }

        let dst_pixel = dest.get_pixel_mut(dx as u32, dy as u32);
        *dst_pixel = alpha_blend(*src_pixel, *dst_pixel, opacity);
    }
}

/// Source-over blend of two straight-alpha pixels.
pub(crate) fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0 * opacity;
    let da = dst[3] as f32 / 255.0;

    let out_a = sa + da * (1.0 - sa);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round() as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}
