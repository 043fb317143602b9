//! imgopt-renderer: on-the-fly image transformation core
//!
//! A request is a set of query parameters. The source image is fetched by
//! URL (with an optional fallback URL) or synthesized from text, pushed
//! through an ordered pipeline of resize, color and compositing stages,
//! and encoded in the requested format.
//!
//! # Example
//!
//! ```no_run
//! use imgopt_renderer::{FetchConfig, Renderer, TransformParams, build_response};
//!
//! let params = TransformParams::from_query("url=https://example.com/a.jpg&w=200&output=webp");
//! let renderer = Renderer::http(&FetchConfig::from_env())?;
//! let rendered = renderer.process(&params)?;
//! let response = build_response(&rendered, &params)?;
//! assert_eq!(response.content_type, "image/webp");
//! # Ok::<(), imgopt_renderer::Error>(())
//! ```
//!
//! # Text images
//!
//! Without a `url`, the `text` parameter renders a canvas instead:
//!
//! ```
//! use imgopt_renderer::{TextOptions, TransformParams, render_text};
//!
//! let params = TransformParams::from_query("text=Hello&w=320&h=120&bg=navy&txtColor=white");
//! let image = render_text("Hello", &TextOptions::from_params(&params))?;
//! assert_eq!(image.dimensions(), (320, 120));
//! # Ok::<(), imgopt_renderer::Error>(())
//! ```

pub mod color;
pub mod config;
pub mod encode;
pub mod error;
pub mod ops;
pub mod params;
pub mod pipeline;
pub mod response;
pub mod service;
pub mod source;
pub mod text;

pub use color::parse_color;
pub use config::{FetchConfig, RenderLimits};
pub use encode::{OutputFormat, encode, encode_to_vec};
pub use error::{Error, Result, TransportError};
pub use params::{
    Encoding, FitMode, Modulation, OutputKind, TextAlign, TextBaseline, TransformParams,
};
pub use pipeline::{Stage, StageContext, apply, apply_with_limits};
pub use response::{EncodedResponse, build_response};
pub use service::{ImageMetadata, Rendered, Renderer};
pub use source::{HttpResponse, HttpTransport, SourceImage, SourceProvider, Transport, decode};
pub use text::{TextOptions, render_text};
