//! Font faces the text renderer can draw with.
//!
//! - [`OutlineTypeface`]: a TrueType/OpenType face found by family name in
//!   the system font database, or loaded from a font file path. Glyph
//!   outlines come from `ttf-parser` and are filled with tiny-skia.
//! - [`BitmapTypeface`]: the bundled 8x8 bitmap font, scaled to the
//!   requested size. It has no external data and cannot fail to load.

use std::path::Path;
use std::sync::LazyLock;

use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};
use resvg::usvg::fontdb;
use tracing::debug;

use super::raster::pixmap_to_rgba_image;
use crate::error::{Error, Result};
use crate::ops::composite::{alpha_blend, composite_over};

/// Vertical metrics in pixels at the face's size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Distance from the baseline to the top of tall glyphs.
    pub ascent: f32,
    /// Recommended distance between consecutive baselines.
    pub line_height: f32,
}

/// A face at a fixed pixel size.
pub trait Typeface {
    fn metrics(&self) -> FontMetrics;

    /// Horizontal advance of `text` in pixels.
    fn advance(&self, text: &str) -> f32;

    /// Draws `text` onto `layer` starting at `x` with its baseline at `baseline`.
    fn draw(&self, layer: &mut RgbaImage, text: &str, x: f32, baseline: f32, color: Rgba<u8>);
}

/// Loads `family` at `size` pixels, falling back to the bundled bitmap face.
pub fn load_or_fallback(family: &str, size: f32) -> Box<dyn Typeface> {
    match OutlineTypeface::load(family, size) {
        Ok(face) => Box::new(face),
        Err(err) => {
            debug!(family, error = %err, "using bundled bitmap font");
            Box::new(BitmapTypeface::new(size))
        }
    }
}

// ============================================================================
// OutlineTypeface
// ============================================================================

static SYSTEM_FONTS: LazyLock<fontdb::Database> = LazyLock::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    debug!(faces = db.len(), "loaded system fonts");
    db
});

/// A scalable face backed by font file data.
pub struct OutlineTypeface {
    data: Vec<u8>,
    index: u32,
    scale: f32,
    metrics: FontMetrics,
}

impl OutlineTypeface {
    /// Resolves `family` as a font file path first, then as a system family name.
    pub fn load(family: &str, size: f32) -> Result<Self> {
        let path = Path::new(family);
        if path.is_file() {
            let data = std::fs::read(path)?;
            return Self::from_data(data, 0, size);
        }

        let query = fontdb::Query {
            families: &[fontdb::Family::Name(family)],
            ..Default::default()
        };
        let id = SYSTEM_FONTS
            .query(&query)
            .ok_or_else(|| Error::FontLoad(format!("no system font named {family:?}")))?;
        let (data, index) = SYSTEM_FONTS
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| Error::FontLoad(format!("font data for {family:?} is unavailable")))?;
        Self::from_data(data, index, size)
    }

    /// Parses raw font data and computes metrics for `size` pixels.
    pub fn from_data(data: Vec<u8>, index: u32, size: f32) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, index)
            .map_err(|e| Error::FontLoad(format!("invalid font data: {e}")))?;
        let scale = size / face.units_per_em() as f32;
        let ascender = face.ascender() as f32;
        let descender = face.descender() as f32;
        let line_gap = face.line_gap() as f32;
        let metrics = FontMetrics {
            ascent: ascender * scale,
            line_height: (ascender - descender + line_gap) * scale,
        };

        Ok(Self {
            data,
            index,
            scale,
            metrics,
        })
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.data, self.index).ok()
    }
}

impl Typeface for OutlineTypeface {
    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn advance(&self, text: &str) -> f32 {
        let Some(face) = self.face() else {
            return 0.0;
        };
        text.chars()
            .filter_map(|c| face.glyph_index(c))
            .filter_map(|id| face.glyph_hor_advance(id))
            .map(|adv| adv as f32 * self.scale)
            .sum()
    }

    fn draw(&self, layer: &mut RgbaImage, text: &str, x: f32, baseline: f32, color: Rgba<u8>) {
        let Some(face) = self.face() else {
            return;
        };
        let Some(mut pixmap) = Pixmap::new(layer.width(), layer.height()) else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        paint.anti_alias = true;

        let mut pen_x = x;
        for c in text.chars() {
            let Some(id) = face.glyph_index(c) else {
                continue;
            };
            let mut outline = GlyphPath {
                builder: PathBuilder::new(),
                origin_x: pen_x,
                baseline,
                scale: self.scale,
            };
            if face.outline_glyph(id, &mut outline).is_some() {
                if let Some(path) = outline.builder.finish() {
                    pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
                }
            }
            pen_x += face.glyph_hor_advance(id).unwrap_or(0) as f32 * self.scale;
        }

        composite_over(layer, &pixmap_to_rgba_image(&pixmap), 0, 0, 1.0);
    }
}

/// Feeds glyph outlines, in font units with y up, into a pixel-space path.
struct GlyphPath {
    builder: PathBuilder,
    origin_x: f32,
    baseline: f32,
    scale: f32,
}

impl GlyphPath {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.baseline - y * self.scale)
    }
}

impl ttf_parser::OutlineBuilder for GlyphPath {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

// ============================================================================
// BitmapTypeface
// ============================================================================

/// Glyph cells per side of a font8x8 glyph.
const CELLS: f32 = 8.0;
/// Rows above the baseline in a font8x8 glyph.
const ASCENT_CELLS: f32 = 7.0;

/// The bundled 8x8 bitmap font, nearest-neighbor scaled.
#[derive(Debug, Clone, Copy)]
pub struct BitmapTypeface {
    size: f32,
}

impl BitmapTypeface {
    pub fn new(size: f32) -> Self {
        Self {
            size: size.max(1.0),
        }
    }

    fn glyph(c: char) -> [u8; 8] {
        BASIC_FONTS
            .get(c)
            .or_else(|| LATIN_FONTS.get(c))
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8])
    }
}

impl Typeface for BitmapTypeface {
    fn metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: self.size * ASCENT_CELLS / CELLS,
            line_height: self.size,
        }
    }

    fn advance(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.size
    }

    fn draw(&self, layer: &mut RgbaImage, text: &str, x: f32, baseline: f32, color: Rgba<u8>) {
        let cell = self.size / CELLS;
        let top = baseline - self.metrics().ascent;
        let (width, height) = (layer.width() as i64, layer.height() as i64);

        for (i, c) in text.chars().enumerate() {
            let rows = Self::glyph(c);
            let left = x + i as f32 * self.size;

            let x0 = (left.floor() as i64).max(0);
            let x1 = ((left + self.size).ceil() as i64).min(width);
            let y0 = (top.floor() as i64).max(0);
            let y1 = ((top + self.size).ceil() as i64).min(height);

            for py in y0..y1 {
                let row = ((py as f32 + 0.5 - top) / cell).floor();
                if !(0.0..CELLS).contains(&row) {
                    continue;
                }
                let bits = rows[row as usize];
                for px in x0..x1 {
                    let col = ((px as f32 + 0.5 - left) / cell).floor();
                    if !(0.0..CELLS).contains(&col) {
                        continue;
                    }
                    if (bits >> col as u32) & 1 == 1 {
                        let dst = layer.get_pixel_mut(px as u32, py as u32);
                        *dst = alpha_blend(color, *dst, 1.0);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_family_falls_back_to_bitmap() {
        let face = load_or_fallback("No Such Family 7f3a", 16.0);
        assert_eq!(
            face.metrics(),
            FontMetrics {
                ascent: 14.0,
                line_height: 16.0
            }
        );
        assert_eq!(face.advance("abc"), 48.0);
    }

    #[test]
    fn garbage_font_data_is_rejected() {
        let err = OutlineTypeface::from_data(vec![0, 1, 2, 3], 0, 12.0).err().unwrap();
        assert!(matches!(err, Error::FontLoad(_)));
    }

    #[test]
    fn bitmap_draws_glyph_pixels_in_color() {
        let face = BitmapTypeface::new(16.0);
        let mut layer = RgbaImage::new(40, 20);
        let ink = Rgba([10, 20, 30, 255]);
        face.draw(&mut layer, "H", 2.0, 16.0, ink);

        let inked: Vec<_> = layer.enumerate_pixels().filter(|(_, _, p)| p[3] > 0).collect();
        assert!(!inked.is_empty());
        assert!(inked.iter().all(|(_, _, p)| **p == ink));
        // Everything stays inside the glyph box.
        assert!(inked.iter().all(|(x, y, _)| (2..18).contains(x) && (2..18).contains(y)));
    }

    #[test]
    fn bitmap_blends_translucent_ink() {
        let face = BitmapTypeface::new(16.0);
        let mut layer = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        face.draw(&mut layer, "H", 2.0, 16.0, Rgba([255, 0, 0, 128]));

        assert!(layer.pixels().all(|p| p[3] == 255));
        assert!(layer.pixels().any(|p| p.0 == [255, 127, 127, 255]));
    }

    #[test]
    fn bitmap_clips_at_layer_edges() {
        let face = BitmapTypeface::new(32.0);
        let mut layer = RgbaImage::new(10, 10);
        face.draw(&mut layer, "WW", -5.0, 20.0, Rgba([0, 0, 0, 255]));
        assert_eq!(layer.dimensions(), (10, 10));
    }

    #[test]
    fn unknown_glyphs_render_as_question_mark() {
        assert_eq!(BitmapTypeface::glyph('\u{1F600}'), BitmapTypeface::glyph('?'));
    }
}
