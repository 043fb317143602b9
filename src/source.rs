//! Source image download and decoding.
//!
//! The network is reached through the [`Transport`] trait so fetch policy
//! (fallback, status handling, body limit, decoding) can be tested without
//! sockets. [`HttpTransport`] is the production implementation.
//!
//! Fallback policy: the `default` URL is tried once, and only when the
//! primary request fails at the transport level. A response with a non-200
//! status is a hard failure even when a fallback is configured.

use std::io::{Cursor, Read};

use image::{ImageFormat, ImageReader, RgbaImage};
use tracing::{debug, instrument, warn};

use crate::config::FetchConfig;
use crate::error::{Error, Result, TransportError};

/// A response whose body has not been read yet.
pub struct HttpResponse {
    pub status: u16,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            body: Box::new(body),
        }
    }
}

/// Something that can issue a GET request.
pub trait Transport: Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a blocking `reqwest` client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Fetch {
                url: String::new(),
                source: TransportError::new(format!("failed to build HTTP client: {e}")),
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| TransportError::new(e.to_string()))?;
        Ok(HttpResponse::new(response.status().as_u16(), response))
    }
}

/// A decoded source image together with the format it was stored in.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: RgbaImage,
    pub format: Option<ImageFormat>,
}

impl SourceImage {
    /// Lowercase format name, `"unknown"` when it could not be detected.
    pub fn format_name(&self) -> &'static str {
        match self.format {
            Some(ImageFormat::Jpeg) => "jpeg",
            Some(ImageFormat::Png) => "png",
            Some(ImageFormat::Gif) => "gif",
            Some(ImageFormat::WebP) => "webp",
            Some(ImageFormat::Tiff) => "tiff",
            Some(ImageFormat::Bmp) => "bmp",
            Some(ImageFormat::Ico) => "ico",
            Some(ImageFormat::Avif) => "avif",
            _ => "unknown",
        }
    }
}

/// Fetches and decodes source images through a [`Transport`].
pub struct SourceProvider<T: Transport> {
    transport: T,
    max_body_bytes: u64,
}

impl SourceProvider<HttpTransport> {
    /// Provider using the real network with the given limits.
    pub fn http(config: &FetchConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(config)?, config.max_body_bytes))
    }
}

impl<T: Transport> SourceProvider<T> {
    pub fn new(transport: T, max_body_bytes: u64) -> Self {
        Self {
            transport,
            max_body_bytes,
        }
    }

    /// Fetches `url`, retrying once against `fallback` on transport failure.
    #[instrument(skip(self))]
    pub fn fetch(&self, url: &str, fallback: Option<&str>) -> Result<SourceImage> {
        let (url, response) = match self.transport.get(url) {
            Ok(response) => (url, response),
            Err(primary) => match fallback.filter(|f| !f.is_empty()) {
                Some(fallback) => {
                    warn!(url, error = %primary, fallback, "primary fetch failed, trying fallback");
                    let response = self.transport.get(fallback).map_err(|source| Error::Fetch {
                        url: fallback.to_string(),
                        source,
                    })?;
                    (fallback, response)
                }
                None => {
                    return Err(Error::Fetch {
                        url: url.to_string(),
                        source: primary,
                    });
                }
            },
        };

        if response.status != 200 {
            return Err(Error::FetchStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        let bytes = self.read_body(url, response.body)?;
        debug!(url, bytes = bytes.len(), "fetched source image");
        decode(&bytes)
    }

    fn read_body(&self, url: &str, body: Box<dyn Read + Send>) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        body.take(self.max_body_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|e| Error::Fetch {
                url: url.to_string(),
                source: TransportError::new(format!("failed to read body: {e}")),
            })?;
        if bytes.len() as u64 > self.max_body_bytes {
            return Err(Error::BodyTooLarge {
                url: url.to_string(),
                limit: self.max_body_bytes,
            });
        }
        Ok(bytes)
    }
}

/// Decodes image bytes, detecting the format from their content.
pub fn decode(bytes: &[u8]) -> Result<SourceImage> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader.format();
    let image = reader.decode().map_err(Error::Decode)?.to_rgba8();
    Ok(SourceImage { image, format })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::encode::{OutputFormat, encode_to_vec};
    use image::Rgba;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory transport: known URLs answer with a status and body,
    /// everything else fails like an unreachable host.
    #[derive(Default)]
    pub struct MockTransport {
        routes: HashMap<String, (u16, Vec<u8>)>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_route(mut self, url: &str, status: u16, body: Vec<u8>) -> Self {
            self.routes.insert(url.to_string(), (status, body));
            self
        }

        pub fn with_png(self, url: &str, width: u32, height: u32, color: Rgba<u8>) -> Self {
            let img = RgbaImage::from_pixel(width, height, color);
            let bytes = encode_to_vec(&img, OutputFormat::Png, 90).unwrap();
            self.with_route(url, 200, bytes)
        }

        pub fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.routes.get(url) {
                Some((status, body)) => Ok(HttpResponse::new(*status, Cursor::new(body.clone()))),
                None => Err(TransportError::new(format!("connection refused: {url}"))),
            }
        }
    }

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn fetches_and_decodes_primary() {
        let provider = SourceProvider::new(
            MockTransport::new().with_png("http://a.test/img.png", 4, 3, RED),
            1 << 20,
        );
        let source = provider.fetch("http://a.test/img.png", None).unwrap();
        assert_eq!(source.image.dimensions(), (4, 3));
        assert_eq!(source.format, Some(ImageFormat::Png));
        assert_eq!(source.format_name(), "png");
    }

    #[test]
    fn unreachable_primary_uses_fallback() {
        let provider = SourceProvider::new(
            MockTransport::new().with_png("http://fallback.test/b.png", 2, 2, BLUE),
            1 << 20,
        );
        let source = provider
            .fetch("http://down.test/a.png", Some("http://fallback.test/b.png"))
            .unwrap();
        assert_eq!(source.image.get_pixel(0, 0), &BLUE);
        assert_eq!(
            provider.transport.requested(),
            vec!["http://down.test/a.png", "http://fallback.test/b.png"]
        );
    }

    #[test]
    fn unreachable_primary_without_fallback_fails() {
        let provider = SourceProvider::new(MockTransport::new(), 1 << 20);
        for fallback in [None, Some("")] {
            let err = provider.fetch("http://down.test/a.png", fallback).unwrap_err();
            assert!(matches!(err, Error::Fetch { ref url, .. } if url == "http://down.test/a.png"));
        }
    }

    #[test]
    fn failing_fallback_is_reported() {
        let provider = SourceProvider::new(MockTransport::new(), 1 << 20);
        let err = provider
            .fetch("http://down.test/a.png", Some("http://also-down.test/b.png"))
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { ref url, .. } if url == "http://also-down.test/b.png"));
    }

    #[test]
    fn error_status_does_not_fall_back() {
        let provider = SourceProvider::new(
            MockTransport::new()
                .with_route("http://a.test/missing.png", 404, Vec::new())
                .with_png("http://fallback.test/b.png", 2, 2, BLUE),
            1 << 20,
        );
        let err = provider
            .fetch("http://a.test/missing.png", Some("http://fallback.test/b.png"))
            .unwrap_err();
        assert!(matches!(err, Error::FetchStatus { status: 404, .. }));
        assert_eq!(provider.transport.requested().len(), 1);
    }

    #[test]
    fn corrupt_body_is_a_decode_error() {
        let provider = SourceProvider::new(
            MockTransport::new().with_route("http://a.test/x", 200, b"\x89PNG\r\n\x1a\nbroken".to_vec()),
            1 << 20,
        );
        let err = provider.fetch("http://a.test/x", None).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn oversized_body_is_rejected() {
        let provider = SourceProvider::new(
            MockTransport::new().with_png("http://a.test/big.png", 64, 64, RED),
            16,
        );
        let err = provider.fetch("http://a.test/big.png", None).unwrap_err();
        assert!(matches!(err, Error::BodyTooLarge { limit: 16, .. }));
    }
}
