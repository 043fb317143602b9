//! Shapes a [`Rendered`] result into response headers and body bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::encode::encode_to_vec;
use crate::error::Result;
use crate::params::{Encoding, TransformParams};
use crate::service::Rendered;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// An encoded response ready to be written out by a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResponse {
    pub content_type: String,
    /// Extra headers, in the order they should be sent.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl EncodedResponse {
    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Serialize)]
struct DataUrlBody {
    data: String,
}

/// Encodes `rendered` according to the output settings in `params`.
pub fn build_response(rendered: &Rendered, params: &TransformParams) -> Result<EncodedResponse> {
    let mut headers = vec![
        (
            "Cache-Control".to_string(),
            format!("max-age={}", params.max_age),
        ),
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ("Access-Control-Allow-Methods".to_string(), "*".to_string()),
        ("Access-Control-Allow-Headers".to_string(), "*".to_string()),
    ];
    if let Some(filename) = &params.filename {
        headers.push((
            "Content-Disposition".to_string(),
            format!("attachment; filename=\"{filename}\""),
        ));
    }

    let image = match rendered {
        Rendered::Metadata(metadata) => {
            return Ok(EncodedResponse {
                content_type: JSON_CONTENT_TYPE.to_string(),
                headers,
                body: serde_json::to_vec(metadata)?,
            });
        }
        Rendered::Image(image) => image,
    };

    let format = params.output_format();
    let bytes = encode_to_vec(image, format, params.quality)?;

    let (content_type, body) = match params.encoding {
        Encoding::Raw => (format.mime().to_string(), bytes),
        Encoding::Base64 => {
            let payload = DataUrlBody {
                data: format!("data:{};base64,{}", format.mime(), STANDARD.encode(&bytes)),
            };
            (JSON_CONTENT_TYPE.to_string(), serde_json::to_vec(&payload)?)
        }
    };

    Ok(EncodedResponse {
        content_type,
        headers,
        body,
    })
}
