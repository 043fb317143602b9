//! tiny-skia helpers shared by the text renderer.

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{FillRule, Mask, Path, PathBuilder, Pixmap, Transform};

/// Cubic Bézier control distance for a quarter circle.
const KAPPA: f32 = 0.552_284_8;

/// Converts a premultiplied tiny-skia pixmap into a straight-alpha image.
pub fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let mut img = RgbaImage::new(width, pixmap.height());

    for (i, pixel) in pixmap.pixels().iter().enumerate() {
        let (r, g, b, a) = unpremultiply(pixel.red(), pixel.green(), pixel.blue(), pixel.alpha());
        let x = i as u32 % width;
        let y = i as u32 / width;
        img.put_pixel(x, y, Rgba([r, g, b, a]));
    }

    img
}

/// Unpremultiplies a premultiplied alpha pixel, rounding to nearest.
fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        return (0, 0, 0, 0);
    }
    let alpha = a as u32;
    let channel = |c: u8| ((c as u32 * 255 + alpha / 2) / alpha).min(255) as u8;
    (channel(r), channel(g), channel(b), a)
}

/// Closed rounded-rectangle path covering `width` x `height`.
///
/// The radius is capped at half the shorter side.
pub fn rounded_rect_path(width: f32, height: f32, radius: f32) -> Option<Path> {
    let r = radius.clamp(0.0, width.min(height) / 2.0);
    let k = r * KAPPA;
    let mut pb = PathBuilder::new();

    pb.move_to(r, 0.0);
    pb.line_to(width - r, 0.0);
    pb.cubic_to(width - r + k, 0.0, width, r - k, width, r);
    pb.line_to(width, height - r);
    pb.cubic_to(width, height - r + k, width - r + k, height, width - r, height);
    pb.line_to(r, height);
    pb.cubic_to(r - k, height, 0.0, height - r + k, 0.0, height - r);
    pb.line_to(0.0, r);
    pb.cubic_to(0.0, r - k, r - k, 0.0, r, 0.0);
    pb.close();

    pb.finish()
}

/// Makes everything outside a rounded rectangle of the given radius transparent.
///
/// Edge pixels keep a fraction of their alpha proportional to coverage.
pub fn clip_rounded_corners(image: &RgbaImage, radius: f32) -> RgbaImage {
    let (width, height) = image.dimensions();
    let Some(mut mask) = Mask::new(width, height) else {
        return image.clone();
    };
    let Some(path) = rounded_rect_path(width as f32, height as f32, radius) else {
        return image.clone();
    };
    mask.fill_path(&path, FillRule::Winding, true, Transform::identity());

    let mut out = image.clone();
    for (pixel, coverage) in out.pixels_mut().zip(mask.data()) {
        let alpha = pixel[3] as u32 * *coverage as u32 / 255;
        pixel[3] = alpha as u8;
        if alpha == 0 {
            pixel.0 = [0, 0, 0, 0];
        }
    }
    out
}
