//! Color resolution from request strings.
//!
//! Accepted forms, checked in this order:
//!
//! - `transparent` (any case) resolves to `(0, 0, 0, 0)`
//! - SVG/CSS color names (`red`, `CornflowerBlue`, ...), case-insensitive
//! - hexadecimal with an optional `#`: `RRGGBBAA`, `RRGGBB`, `RGBA`, `RGB`

use crate::error::{Error, Result};
use image::Rgba;

/// Fully transparent black.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Parses a color specification into straight (non-premultiplied) RGBA.
pub fn parse_color(input: &str) -> Result<Rgba<u8>> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("transparent") {
        return Ok(TRANSPARENT);
    }

    let lower = trimmed.to_ascii_lowercase();
    if let Some(named) = palette::named::from_str(&lower) {
        return Ok(Rgba([named.red, named.green, named.blue, 255]));
    }

    parse_hex(trimmed).ok_or_else(|| Error::ColorParse {
        input: input.to_string(),
    })
}

fn parse_hex(input: &str) -> Option<Rgba<u8>> {
    let digits = input.strip_prefix('#').unwrap_or(input);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;

    let channels = match digits.len() {
        8 => value.to_be_bytes(),
        6 => {
            let [_, r, g, b] = value.to_be_bytes();
            [r, g, b, 0xff]
        }
        4 => expand_nibbles(value),
        3 => {
            let [r, g, b, _] = expand_nibbles(value << 4 | 0xf);
            [r, g, b, 0xff]
        }
        _ => return None,
    };
    Some(Rgba(channels))
}

/// Expands a 16-bit `RGBA` shorthand into four doubled 8-bit channels.
fn expand_nibbles(value: u32) -> [u8; 4] {
    let nibble = |shift: u32| {
        let n = ((value >> shift) & 0xf) as u8;
        n << 4 | n
    };
    [nibble(12), nibble(8), nibble(4), nibble(0)]
}
