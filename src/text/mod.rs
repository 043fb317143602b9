//! Single-line text rendering onto a solid canvas.
//!
//! The text is anchored like a 2D canvas `fillText` call: the baseline
//! option picks a vertical anchor, the alignment option picks a horizontal
//! one, and the line box is centered vertically on that anchor.

pub mod raster;
pub mod typeface;

use image::RgbaImage;
use tracing::debug;

use crate::color::parse_color;
use crate::config::RenderLimits;
use crate::error::Result;
use crate::params::{TextAlign, TextBaseline, TransformParams};

pub use raster::clip_rounded_corners;
pub use typeface::{BitmapTypeface, FontMetrics, OutlineTypeface, Typeface, load_or_fallback};

pub const DEFAULT_CANVAS_SIZE: u32 = 800;
pub const DEFAULT_BACKGROUND: &str = "white";
pub const DEFAULT_TEXT_COLOR: &str = "black";
pub const DEFAULT_FONT_FAMILY: &str = "Arial";

/// Resolved settings for one text canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub color: String,
    pub font_size: u32,
    pub font_family: String,
    pub align: TextAlign,
    pub baseline: TextBaseline,
    pub rounded_corners: bool,
    pub corner_radius: u32,
    /// Bounds the canvas size before it is allocated.
    pub limits: RenderLimits,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self::from_params(&TransformParams::default())
    }
}

impl TextOptions {
    /// Options for a standalone text image. Zero sizes take their defaults.
    pub fn from_params(params: &TransformParams) -> Self {
        Self {
            width: or_default(params.width, DEFAULT_CANVAS_SIZE),
            height: or_default(params.height, DEFAULT_CANVAS_SIZE),
            background: params
                .background
                .clone()
                .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string()),
            color: params
                .text_color
                .clone()
                .unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string()),
            font_size: or_default(params.font_size, crate::params::DEFAULT_FONT_SIZE),
            font_family: params
                .font_family
                .clone()
                .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
            align: params.text_align,
            baseline: params.text_baseline,
            rounded_corners: params.rounded_corners,
            corner_radius: or_default(params.corner_radius, crate::params::DEFAULT_CORNER_RADIUS),
            limits: RenderLimits::default(),
        }
    }

    /// Options for text drawn over a fetched image: same as
    /// [`from_params`](Self::from_params) on a transparent background.
    pub fn overlay(params: &TransformParams) -> Self {
        Self {
            background: "transparent".to_string(),
            ..Self::from_params(params)
        }
    }

    pub fn with_limits(self, limits: RenderLimits) -> Self {
        Self { limits, ..self }
    }
}

fn or_default(value: u32, default: u32) -> u32 {
    if value == 0 { default } else { value }
}

/// Vertical anchor for `baseline` on a canvas `height` pixels tall.
///
/// `ascent` is floored to whole pixels before use.
pub fn baseline_anchor(baseline: TextBaseline, height: u32, font_size: u32, ascent: f32) -> f32 {
    let height = height as f32;
    let size = font_size as f32;
    let ascent = ascent.floor();
    match baseline {
        TextBaseline::Top => size / 2.0,
        TextBaseline::Hanging => size - ascent,
        TextBaseline::Middle => height / 2.0,
        TextBaseline::Alphabetic => height / 2.0 + ascent / 2.0,
        TextBaseline::Ideographic => height / 2.0 + ascent,
        TextBaseline::Bottom => height - size / 2.0,
    }
}

/// Horizontal anchor and the fraction of the text advance left of it.
pub fn alignment_anchor(align: TextAlign, width: u32) -> (f32, f32) {
    let width = width as f32;
    match align {
        TextAlign::Left => (0.0, 0.0),
        TextAlign::Center => (width / 2.0, 0.5),
        TextAlign::Right => (width, 1.0),
    }
}

/// Renders `text` onto a new canvas described by `options`.
///
/// Color errors and oversized canvases abort; an unusable font family falls
/// back to the bundled bitmap face.
pub fn render_text(text: &str, options: &TextOptions) -> Result<RgbaImage> {
    options.limits.check(options.width, options.height)?;
    let background = parse_color(&options.background)?;
    let color = parse_color(&options.color)?;

    let mut canvas = RgbaImage::from_pixel(options.width, options.height, background);
    let face = load_or_fallback(&options.font_family, options.font_size as f32);
    let metrics = face.metrics();

    let text_y = baseline_anchor(options.baseline, options.height, options.font_size, metrics.ascent);
    let (anchor_x, fraction_x) = alignment_anchor(options.align, options.width);
    let x = anchor_x - fraction_x * face.advance(text);
    let baseline = text_y + 0.5 * metrics.line_height;

    debug!(
        text,
        width = options.width,
        height = options.height,
        x,
        baseline,
        "rendering text"
    );

    face.draw(&mut canvas, text, x, baseline, color);

    if options.rounded_corners {
        canvas = clip_rounded_corners(&canvas, options.corner_radius as f32);
    }
    Ok(canvas)
}
