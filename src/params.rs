//! Request parameters, resolved from a query string into typed fields.
//!
//! Parsing never fails: absent or unparsable values fall back to the
//! documented defaults, so every field is always defined.
//!
//! | Key | Field | Default |
//! |---|---|---|
//! | `url` | [`url`](TransformParams::url) | none |
//! | `default` | [`default_url`](TransformParams::default_url) | none |
//! | `w` / `h` | [`width`](TransformParams::width) / [`height`](TransformParams::height) | `0` (unspecified) |
//! | `dpr` | [`dpr`](TransformParams::dpr) | `1.0` |
//! | `fit` | [`fit`](TransformParams::fit) | none |
//! | `bg` / `cbg` | [`background`](TransformParams::background) / [`contain_background`](TransformParams::contain_background) | none |
//! | `blur` / `gam` / `sharp` | blur sigma / gamma / sharpen sigma | `0` (off) |
//! | `mod` | [`modulate`](TransformParams::modulate) | none |
//! | `tint` | [`tint`](TransformParams::tint) | none |
//! | `we` | [`without_enlargement`](TransformParams::without_enlargement) | `false` |
//! | `output` | [`output`](TransformParams::output) | JPEG |
//! | `q` | [`quality`](TransformParams::quality) | `80` |
//! | `encoding` | [`encoding`](TransformParams::encoding) | raw |
//! | `maxage` | [`max_age`](TransformParams::max_age) | `31536000` |
//! | `l` | [`compression`](TransformParams::compression) | `6` |
//! | `filename` | [`filename`](TransformParams::filename) | none |
//! | `il`, `n`, `page` | interlace / pages / page | `false`, `0`, `0` |
//! | `text`, `txtColor`, `fontSize`, `fontFamily` | text overlay | none, none, `48`, none |
//! | `textAlign`, `textBaseline` | text placement | center, middle |
//! | `roundedCorners`, `cornerRadius` | text canvas clip | `false`, `20` |

use std::collections::HashMap;

use serde::Serialize;

use crate::encode::OutputFormat;

pub const DEFAULT_QUALITY: u8 = 80;
pub const DEFAULT_MAX_AGE: u64 = 31_536_000;
pub const DEFAULT_COMPRESSION: u32 = 6;
pub const DEFAULT_FONT_SIZE: u32 = 48;
pub const DEFAULT_CORNER_RADIUS: u32 = 20;

// ============================================================================
// Enumerated parameters
// ============================================================================

/// How the image is fitted into the requested `w` x `h` box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Fit inside the box, preserving aspect ratio.
    Contain,
    /// Cover the box, preserving aspect ratio, and crop the center.
    Fill,
    /// Same geometry as [`FitMode::Contain`].
    Inside,
    /// Scale to the exact box, ignoring aspect ratio.
    Outside,
}

impl FitMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "contain" => Some(Self::Contain),
            "fill" => Some(Self::Fill),
            "inside" => Some(Self::Inside),
            "outside" => Some(Self::Outside),
            _ => None,
        }
    }
}

/// What the response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase", tag = "kind", content = "format")]
pub enum OutputKind {
    /// The transformed image, encoded in the given format.
    Image(OutputFormat),
    /// Width, height and format of the fetched image as JSON.
    Json,
}

impl OutputKind {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Image(OutputFormat::parse(value))
        }
    }
}

impl Default for OutputKind {
    fn default() -> Self {
        Self::Image(OutputFormat::default())
    }
}

/// Body encoding of an image response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Encoded image bytes.
    #[default]
    Raw,
    /// JSON object carrying a base64 `data:` URL.
    Base64,
}

impl Encoding {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("base64") {
            Self::Base64
        } else {
            Self::Raw
        }
    }
}

/// Horizontal placement of rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    /// Unknown values fall back to [`TextAlign::Center`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Self::Left,
            "right" => Self::Right,
            _ => Self::Center,
        }
    }
}

/// Vertical placement of rendered text, named after the canvas baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum TextBaseline {
    Top,
    Hanging,
    #[default]
    Middle,
    Alphabetic,
    Ideographic,
    Bottom,
}

impl TextBaseline {
    /// Unknown values fall back to [`TextBaseline::Middle`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" => Self::Top,
            "hanging" => Self::Hanging,
            "alphabetic" => Self::Alphabetic,
            "ideographic" => Self::Ideographic,
            "bottom" => Self::Bottom,
            _ => Self::Middle,
        }
    }
}

/// Brightness and saturation percentages plus a hue rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct Modulation {
    pub brightness: f64,
    pub saturation: f64,
    pub hue: f64,
}

impl Modulation {
    /// Parses `brightness,saturation,hue`.
    ///
    /// Exactly three parts are required; an unparsable part takes its
    /// default (`1`, `1`, `0`).
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.split(',').collect();
        let [brightness, saturation, hue] = parts.as_slice() else {
            return None;
        };
        Some(Self {
            brightness: parse_f64(brightness, 1.0),
            saturation: parse_f64(saturation, 1.0),
            hue: parse_f64(hue, 0.0),
        })
    }
}

// ============================================================================
// TransformParams
// ============================================================================

/// Fully resolved parameters for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct TransformParams {
    pub url: Option<String>,
    /// Fallback source tried once when fetching `url` fails at the transport level.
    pub default_url: Option<String>,
    /// Target width, `0` when unspecified.
    pub width: u32,
    /// Target height, `0` when unspecified.
    pub height: u32,
    pub dpr: f64,
    pub fit: Option<FitMode>,
    pub background: Option<String>,
    pub contain_background: Option<String>,
    pub without_enlargement: bool,
    pub blur: f64,
    pub gamma: f64,
    pub modulate: Option<Modulation>,
    pub sharpen: f64,
    pub tint: Option<String>,
    pub output: OutputKind,
    pub quality: u8,
    pub encoding: Encoding,
    pub max_age: u64,
    /// Accepted for compatibility; the encoder derives effort from `quality`.
    pub compression: u32,
    pub filename: Option<String>,
    /// Recognized but unsupported.
    pub interlace: bool,
    /// Recognized but unsupported.
    pub pages: u32,
    /// Recognized but unsupported.
    pub page: u32,
    pub text: Option<String>,
    pub text_color: Option<String>,
    pub font_size: u32,
    pub font_family: Option<String>,
    pub text_align: TextAlign,
    pub text_baseline: TextBaseline,
    pub rounded_corners: bool,
    pub corner_radius: u32,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self::from_pairs(std::iter::empty::<(String, String)>())
    }
}

impl TransformParams {
    /// Parses a URL query string (with or without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(form_urlencoded::parse(query.as_bytes()))
    }

    /// Builds parameters from decoded key/value pairs.
    ///
    /// When a key repeats, the first value wins.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map: HashMap<String, String> = HashMap::new();
        for (key, value) in pairs {
            map.entry(key.as_ref().to_string())
                .or_insert_with(|| value.as_ref().to_string());
        }
        let get = |key: &str| map.get(key).map(String::as_str).unwrap_or("");
        let text = |key: &str| non_empty(get(key));

        Self {
            url: text("url"),
            default_url: text("default"),
            width: parse_u32(get("w"), 0),
            height: parse_u32(get("h"), 0),
            dpr: parse_f64(get("dpr"), 1.0),
            fit: FitMode::parse(get("fit")),
            background: text("bg"),
            contain_background: text("cbg"),
            without_enlargement: get("we") == "true",
            blur: parse_f64(get("blur"), 0.0),
            gamma: parse_f64(get("gam"), 0.0),
            modulate: non_empty(get("mod")).and_then(|m| Modulation::parse(&m)),
            sharpen: parse_f64(get("sharp"), 0.0),
            tint: text("tint"),
            output: OutputKind::parse(get("output")),
            quality: parse_i64(get("q"), DEFAULT_QUALITY as i64).clamp(0, 100) as u8,
            encoding: Encoding::parse(get("encoding")),
            max_age: parse_i64(get("maxage"), DEFAULT_MAX_AGE as i64).max(0) as u64,
            compression: parse_u32(get("l"), DEFAULT_COMPRESSION),
            filename: text("filename"),
            interlace: get("il") == "true",
            pages: parse_u32(get("n"), 0),
            page: parse_u32(get("page"), 0),
            text: text("text"),
            text_color: text("txtColor"),
            font_size: parse_u32(get("fontSize"), DEFAULT_FONT_SIZE),
            font_family: text("fontFamily"),
            text_align: TextAlign::parse(get("textAlign")),
            text_baseline: TextBaseline::parse(get("textBaseline")),
            rounded_corners: get("roundedCorners") == "true",
            corner_radius: parse_u32(get("cornerRadius"), DEFAULT_CORNER_RADIUS),
        }
    }

    /// Output format used when encoding an image response.
    pub fn output_format(&self) -> OutputFormat {
        match self.output {
            OutputKind::Image(format) => format,
            OutputKind::Json => OutputFormat::default(),
        }
    }

    /// Serializes the resolved parameters to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_i64(value: &str, default: i64) -> i64 {
    value.trim().parse().unwrap_or(default)
}

/// Negative values count as unspecified and become `0`.
fn parse_u32(value: &str, default: u32) -> u32 {
    match value.trim().parse::<i64>() {
        Ok(v) => u32::try_from(v.max(0)).unwrap_or(u32::MAX),
        Err(_) => default,
    }
}

fn parse_f64(value: &str, default: f64) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => default,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_uses_defaults() {
        let params = TransformParams::from_query("");
        assert_eq!(params.url, None);
        assert_eq!((params.width, params.height), (0, 0));
        assert_eq!(params.dpr, 1.0);
        assert_eq!(params.quality, 80);
        assert_eq!(params.max_age, 31_536_000);
        assert_eq!(params.compression, 6);
        assert_eq!(params.font_size, 48);
        assert_eq!(params.corner_radius, 20);
        assert_eq!(params.output, OutputKind::Image(OutputFormat::Jpeg));
        assert_eq!(params.encoding, Encoding::Raw);
        assert_eq!(params.text_align, TextAlign::Center);
        assert_eq!(params.text_baseline, TextBaseline::Middle);
        assert!(!params.without_enlargement);
        assert_eq!(params, TransformParams::default());
    }

    #[test]
    fn parses_full_query() {
        let params = TransformParams::from_query(
            "?url=https%3A%2F%2Fexample.test%2Fa.jpg&w=200&h=100&dpr=2&fit=contain&bg=red\
             &we=true&mod=10,20,90&output=png&q=55&encoding=base64&filename=a.png\
             &text=Hello%20World&textAlign=right&textBaseline=bottom&roundedCorners=true",
        );
        assert_eq!(params.url.as_deref(), Some("https://example.test/a.jpg"));
        assert_eq!((params.width, params.height), (200, 100));
        assert_eq!(params.dpr, 2.0);
        assert_eq!(params.fit, Some(FitMode::Contain));
        assert_eq!(params.background.as_deref(), Some("red"));
        assert!(params.without_enlargement);
        assert_eq!(
            params.modulate,
            Some(Modulation {
                brightness: 10.0,
                saturation: 20.0,
                hue: 90.0
            })
        );
        assert_eq!(params.output, OutputKind::Image(OutputFormat::Png));
        assert_eq!(params.quality, 55);
        assert_eq!(params.encoding, Encoding::Base64);
        assert_eq!(params.text.as_deref(), Some("Hello World"));
        assert_eq!(params.text_align, TextAlign::Right);
        assert_eq!(params.text_baseline, TextBaseline::Bottom);
        assert!(params.rounded_corners);
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let params = TransformParams::from_query("w=abc&dpr=x&q=loud&maxage=&blur=NaN");
        assert_eq!(params.width, 0);
        assert_eq!(params.dpr, 1.0);
        assert_eq!(params.quality, 80);
        assert_eq!(params.max_age, 31_536_000);
        assert_eq!(params.blur, 0.0);
    }

    #[test]
    fn out_of_range_numbers_are_clamped() {
        let params = TransformParams::from_query("w=-5&q=250");
        assert_eq!(params.width, 0);
        assert_eq!(params.quality, 100);
    }

    #[test]
    fn modulation_requires_three_parts() {
        assert!(Modulation::parse("1,2").is_none());
        assert!(Modulation::parse("1,2,3,4").is_none());
        let m = Modulation::parse("x,,45").unwrap();
        assert_eq!((m.brightness, m.saturation, m.hue), (1.0, 1.0, 45.0));
    }

    #[test]
    fn json_output_and_unknown_fit() {
        let params = TransformParams::from_query("output=JSON&fit=stretch");
        assert_eq!(params.output, OutputKind::Json);
        assert_eq!(params.fit, None);
    }

    #[test]
    fn only_literal_true_enables_flags() {
        let params = TransformParams::from_query("we=1&il=yes&roundedCorners=TRUE");
        assert!(!params.without_enlargement);
        assert!(!params.interlace);
        assert!(!params.rounded_corners);
    }

    #[test]
    fn first_repeated_key_wins() {
        let params = TransformParams::from_query("w=10&w=20");
        assert_eq!(params.width, 10);
    }

    #[test]
    fn params_serialize_camel_case() {
        let json = TransformParams::from_query("w=5").to_json_pretty().unwrap();
        assert!(json.contains("\"withoutEnlargement\""));
        assert!(json.contains("\"width\": 5"));
    }
}
