//! Request orchestration: source selection, text overlay, metadata and the
//! pipeline, in that order.

use image::RgbaImage;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::{FetchConfig, RenderLimits};
use crate::error::{Error, Result};
use crate::ops::overlay_center;
use crate::params::{OutputKind, TransformParams};
use crate::pipeline;
use crate::source::{HttpTransport, SourceProvider, Transport};
use crate::text::{TextOptions, render_text};

/// Dimensions and detected format of a fetched source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

/// Result of processing one request, before encoding.
#[derive(Debug, Clone)]
pub enum Rendered {
    Image(RgbaImage),
    Metadata(ImageMetadata),
}

/// Turns parameter sets into rendered images.
pub struct Renderer<T: Transport> {
    provider: SourceProvider<T>,
    limits: RenderLimits,
}

impl Renderer<HttpTransport> {
    /// Renderer fetching sources over HTTP.
    pub fn http(config: &FetchConfig) -> Result<Self> {
        Ok(Self::new(SourceProvider::http(config)?))
    }
}

impl<T: Transport> Renderer<T> {
    pub fn new(provider: SourceProvider<T>) -> Self {
        Self {
            provider,
            limits: RenderLimits::default(),
        }
    }

    /// Replaces the default output size limits.
    pub fn with_limits(self, limits: RenderLimits) -> Self {
        Self { limits, ..self }
    }

    /// Produces the image (or metadata) described by `params`.
    ///
    /// A `url` wins over `text`; when both are set the text is drawn on a
    /// transparent canvas and centered over the fetched image. JSON output
    /// reports the fetched image without running the pipeline. For a text
    /// image `bg` is the canvas color and the pipeline's background stage is
    /// skipped, so rounded corners stay transparent.
    #[instrument(skip_all, fields(url = params.url.as_deref(), text = params.text.as_deref()))]
    pub fn process(&self, params: &TransformParams) -> Result<Rendered> {
        let image = match (&params.url, &params.text) {
            (Some(url), text) => {
                let source = self.provider.fetch(url, params.default_url.as_deref())?;
                let format = source.format_name();
                let mut image = source.image;

                if let Some(text) = text {
                    let options = TextOptions::overlay(params).with_limits(self.limits);
                    let overlay = render_text(text, &options)?;
                    image = overlay_center(&image, &overlay, 1.0);
                }

                if params.output == OutputKind::Json {
                    let (width, height) = image.dimensions();
                    debug!(width, height, format, "returning metadata");
                    return Ok(Rendered::Metadata(ImageMetadata {
                        width,
                        height,
                        format: format.to_string(),
                    }));
                }
                image
            }
            (None, Some(text)) => {
                let options = TextOptions::from_params(params).with_limits(self.limits);
                let canvas = render_text(text, &options)?;
                let params = TransformParams {
                    background: None,
                    ..params.clone()
                };
                return pipeline::apply_with_limits(canvas, &params, self.limits)
                    .map(Rendered::Image);
            }
            (None, None) => return Err(Error::MissingSource),
        };

        pipeline::apply_with_limits(image, params, self.limits).map(Rendered::Image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::MockTransport;
    use image::Rgba;

    const URL: &str = "http://img.test/photo.png";

    fn renderer() -> Renderer<MockTransport> {
        let transport = MockTransport::new().with_png(URL, 400, 300, Rgba([0, 0, 255, 255]));
        Renderer::new(SourceProvider::new(transport, 1 << 20))
    }

    fn image(rendered: Rendered) -> RgbaImage {
        match rendered {
            Rendered::Image(image) => image,
            Rendered::Metadata(m) => panic!("expected an image, got {m:?}"),
        }
    }

    #[test]
    fn missing_url_and_text_is_an_error() {
        let err = renderer().process(&TransformParams::default()).unwrap_err();
        assert!(matches!(err, Error::MissingSource));
    }

    #[test]
    fn fetched_image_runs_through_pipeline() {
        let params = TransformParams::from_query(&format!("url={URL}&w=100&h=100&fit=contain"));
        let out = image(renderer().process(&params).unwrap());
        assert_eq!(out.dimensions(), (100, 75));
    }

    #[test]
    fn json_output_reports_source_metadata() {
        let params = TransformParams::from_query(&format!("url={URL}&output=json&w=10"));
        match renderer().process(&params).unwrap() {
            Rendered::Metadata(meta) => assert_eq!(
                meta,
                ImageMetadata {
                    width: 400,
                    height: 300,
                    format: "png".to_string()
                }
            ),
            Rendered::Image(_) => panic!("expected metadata"),
        }
    }

    #[test]
    fn text_only_renders_default_canvas() {
        let params = TransformParams::from_query("text=Hello&fontFamily=No%20Such%20Family%207f3a");
        let out = image(renderer().process(&params).unwrap());
        assert_eq!(out.dimensions(), (800, 800));
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn text_over_fetched_image_keeps_the_image_visible() {
        let params = TransformParams::from_query(&format!(
            "url={URL}&text=Hi&txtColor=white&fontFamily=No%20Such%20Family%207f3a"
        ));
        let out = image(renderer().process(&params).unwrap());
        assert_eq!(out.dimensions(), (400, 300));
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert!(out.pixels().any(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn text_background_does_not_refill_rounded_corners() {
        let params = TransformParams::from_query(
            "text=Hi&w=120&h=60&bg=navy&roundedCorners=true&fontFamily=No%20Such%20Family%207f3a",
        );
        let out = image(renderer().process(&params).unwrap());
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(119, 59)[3], 0);
        assert_eq!(out.get_pixel(60, 2), &Rgba([0, 0, 128, 255]));
    }

    #[test]
    fn oversized_requests_fail_with_too_large() {
        let params = TransformParams::from_query("text=Hi&w=100000&h=100000");
        let err = renderer().process(&params).unwrap_err();
        assert!(matches!(err, Error::TooLarge { .. }));

        let params = TransformParams::from_query(&format!("url={URL}&dpr=1e10"));
        let err = renderer().process(&params).unwrap_err();
        assert!(matches!(err, Error::Stage { stage: "device pixel ratio", .. }));

        let small = renderer().with_limits(RenderLimits {
            max_dimension: 200,
            max_pixels: u64::MAX,
        });
        let params = TransformParams::from_query(&format!("url={URL}&w=300"));
        let err = small.process(&params).unwrap_err();
        assert!(matches!(err, Error::Stage { stage: "resize", .. }));
    }

    #[test]
    fn fetch_errors_propagate() {
        let params = TransformParams::from_query("url=http://down.test/a.png");
        let err = renderer().process(&params).unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }
}
