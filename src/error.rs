//! Error taxonomy shared by every stage of a request.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Transport-level failure reported by a [`Transport`](crate::source::Transport).
#[derive(Error, Debug)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to fetch image from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to fetch image from {url}: HTTP status {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("response body from {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: u64 },

    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("invalid color {input:?}")]
    ColorParse { input: String },

    #[error("failed to apply {stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error(
        "image size {width}x{height} exceeds the limit of {max_dimension}px per side \
         or {max_pixels} pixels"
    )]
    TooLarge {
        width: u32,
        height: u32,
        max_dimension: u32,
        max_pixels: u64,
    },

    #[error("failed to load font: {0}")]
    FontLoad(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("missing url or text parameter")]
    MissingSource,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wraps an error with the name of the pipeline stage that produced it.
    pub fn in_stage(self, stage: &'static str) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_names_stage_and_cause() {
        let err = Error::ColorParse {
            input: "nope".into(),
        }
        .in_stage("tint");
        let message = err.to_string();
        assert!(message.contains("tint"));
        assert!(message.contains("nope"));
    }

    #[test]
    fn fetch_status_message_includes_status() {
        let err = Error::FetchStatus {
            url: "http://example.test/a.png".into(),
            status: 404,
        };
        assert!(err.to_string().contains("404"));
    }
}
