//! Output encoding.
//!
//! | Format | Encoder | Quality |
//! |---|---|---|
//! | JPEG (default) | `image::codecs::jpeg`, alpha flattened onto white | passed through, clamped to 1-100 |
//! | PNG | `image::codecs::png` | picks compression effort only, always lossless |
//! | GIF | `image::codecs::gif` | ignored |
//! | TIFF | `image::codecs::tiff` | ignored |
//! | WebP | `webp` (libwebp, lossy) | passed through |

use std::io::{Cursor, Write};

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::ops::composite::composite_over;

/// Backdrop for formats without an alpha channel.
const FLATTEN_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Encodable output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Gif,
    Tiff,
    WebP,
}

impl OutputFormat {
    /// Parses a format name; anything unrecognized, the empty string
    /// included, falls back to JPEG.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            "gif" => Self::Gif,
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::WebP,
            _ => Self::Jpeg,
        }
    }

    /// Short name used in MIME types and `data:` URLs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
            Self::WebP => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Tiff => "image/tiff",
            Self::WebP => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
            Self::WebP => "webp",
        }
    }
}

/// PNG compression effort for a 0-100 quality value.
pub fn png_compression(quality: u8) -> CompressionType {
    match quality {
        0..=24 => CompressionType::Fast,
        25..=49 => CompressionType::Uncompressed,
        50..=74 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Encodes `image` and writes the bytes to `writer`.
pub fn encode<W: Write>(
    mut writer: W,
    image: &RgbaImage,
    format: OutputFormat,
    quality: u8,
) -> Result<()> {
    let bytes = encode_to_vec(image, format, quality)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Encodes `image` into an in-memory buffer.
pub fn encode_to_vec(image: &RgbaImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    let mut buffer = Vec::new();
    let fail = |err: image::ImageError| Error::Encode(format!("{}: {err}", format.name()));

    match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(flatten(image)).to_rgb8();
            JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(fail)?;
        }
        OutputFormat::Png => {
            PngEncoder::new_with_quality(&mut buffer, png_compression(quality), FilterType::Adaptive)
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(fail)?;
        }
        OutputFormat::Gif => {
            GifEncoder::new(&mut buffer)
                .encode(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(fail)?;
        }
        OutputFormat::Tiff => {
            TiffEncoder::new(Cursor::new(&mut buffer))
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(fail)?;
        }
        OutputFormat::WebP => {
            let encoded = webp::Encoder::from_rgba(image.as_raw(), width, height)
                .encode_simple(false, quality as f32)
                .map_err(|err| Error::Encode(format!("webp: {err:?}")))?;
            buffer.extend_from_slice(&encoded);
        }
    }

    Ok(buffer)
}

/// Composites `image` over an opaque white canvas.
fn flatten(image: &RgbaImage) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(image.width(), image.height(), FLATTEN_BACKGROUND);
    composite_over(&mut canvas, image, 0, 0, 1.0);
    canvas
}
