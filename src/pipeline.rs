//! The ordered transform pipeline.
//!
//! [`Stage::plan`] turns a [`TransformParams`] into the list of stages whose
//! trigger conditions hold, in their fixed order. [`apply`] runs that plan
//! over an image. Each stage consumes the current image and produces a new
//! one; the original source dimensions stay available to the stages that
//! need them (fit geometry and the enlargement guard). Every stage that
//! picks a new size checks it against [`RenderLimits`] before allocating.
//!
//! | # | Stage | Runs when |
//! |---|---|---|
//! | 1 | resize | `w > 0` or `h > 0` |
//! | 2 | fit | a fit mode is set |
//! | 3 | background | `bg` is set |
//! | 4 | blur | `blur > 0` |
//! | 5 | gamma | `gam > 0` |
//! | 6 | modulate | `mod` is a valid triple |
//! | 7 | sharpen | `sharp > 0` |
//! | 8 | device pixel ratio | `dpr > 0` and `dpr != 1` |
//! | 9 | contain background | `cbg` is set |
//! | 10 | enlargement guard | `we=true` and a target exceeds the source |
//! | 11 | tint | `tint` is set |
//! | 12 | interlace / page | `il=true`, `n > 0` or `page > 0` (unsupported, logged) |

use image::{Rgba, RgbaImage};
use tracing::{debug, instrument, warn};

use crate::color::parse_color;
use crate::config::RenderLimits;
use crate::error::Result;
use crate::ops::{adjust, adjust_hue, overlay_center, paste_center, resize, tint};
use crate::params::{FitMode, Modulation, TransformParams};

/// Opacity of the uniform color layer laid down by the tint stage.
pub const TINT_OPACITY: f32 = 0.5;

/// One step of the pipeline with its resolved arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Resize { width: u32, height: u32 },
    Fit { mode: FitMode, width: u32, height: u32 },
    Background(String),
    Blur(f64),
    Gamma(f64),
    Modulate(Modulation),
    Sharpen(f64),
    DevicePixelRatio(f64),
    ContainBackground { color: String, width: u32, height: u32 },
    EnlargementGuard { width: u32, height: u32 },
    Tint(String),
    Interlace,
    PageSelection { pages: u32, page: u32 },
}

/// State threaded through the stages.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub image: RgbaImage,
    /// Dimensions of the image handed to [`apply`].
    pub original: (u32, u32),
    pub limits: RenderLimits,
}

impl StageContext {
    pub fn new(image: RgbaImage) -> Self {
        Self::with_limits(image, RenderLimits::default())
    }

    pub fn with_limits(image: RgbaImage, limits: RenderLimits) -> Self {
        let original = image.dimensions();
        Self {
            image,
            original,
            limits,
        }
    }
}

impl Stage {
    /// Stages triggered by `params`, in execution order.
    pub fn plan(params: &TransformParams) -> Vec<Stage> {
        let (width, height) = (params.width, params.height);
        let mut stages = Vec::new();

        if width > 0 || height > 0 {
            stages.push(Stage::Resize { width, height });
        }
        if let Some(mode) = params.fit {
            stages.push(Stage::Fit {
                mode,
                width,
                height,
            });
        }
        if let Some(color) = &params.background {
            stages.push(Stage::Background(color.clone()));
        }
        if params.blur > 0.0 {
            stages.push(Stage::Blur(params.blur));
        }
        if params.gamma > 0.0 {
            stages.push(Stage::Gamma(params.gamma));
        }
        if let Some(modulation) = params.modulate {
            stages.push(Stage::Modulate(modulation));
        }
        if params.sharpen > 0.0 {
            stages.push(Stage::Sharpen(params.sharpen));
        }
        if params.dpr > 0.0 && params.dpr != 1.0 {
            stages.push(Stage::DevicePixelRatio(params.dpr));
        }
        if let Some(color) = &params.contain_background {
            stages.push(Stage::ContainBackground {
                color: color.clone(),
                width,
                height,
            });
        }
        if params.without_enlargement {
            stages.push(Stage::EnlargementGuard { width, height });
        }
        if let Some(color) = &params.tint {
            stages.push(Stage::Tint(color.clone()));
        }
        if params.interlace {
            stages.push(Stage::Interlace);
        }
        if params.pages > 0 || params.page > 0 {
            stages.push(Stage::PageSelection {
                pages: params.pages,
                page: params.page,
            });
        }

        stages
    }

    /// Name used in logs and in [`Error::Stage`](crate::error::Error::Stage).
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Resize { .. } => "resize",
            Stage::Fit { .. } => "fit",
            Stage::Background(_) => "background",
            Stage::Blur(_) => "blur",
            Stage::Gamma(_) => "gamma",
            Stage::Modulate(_) => "modulate",
            Stage::Sharpen(_) => "sharpen",
            Stage::DevicePixelRatio(_) => "device pixel ratio",
            Stage::ContainBackground { .. } => "contain background",
            Stage::EnlargementGuard { .. } => "enlargement guard",
            Stage::Tint(_) => "tint",
            Stage::Interlace => "interlace",
            Stage::PageSelection { .. } => "page selection",
        }
    }

    /// Runs the stage, returning the image for the next one.
    pub fn run(&self, ctx: &StageContext) -> Result<RgbaImage> {
        let image = &ctx.image;
        let current = image.dimensions();

        let out = match self {
            Stage::Resize { width, height } => {
                let w = if *width > 0 { *width } else { current.0 };
                let h = if *height > 0 { *height } else { current.1 };
                self.check(ctx, (w, h))?;
                resize::resize_exact(image, w, h)
            }
            Stage::Fit {
                mode,
                width,
                height,
            } => {
                let target = (
                    if *width > 0 { *width } else { current.0 },
                    if *height > 0 { *height } else { current.1 },
                );
                self.check(ctx, target)?;
                match mode {
                    FitMode::Contain | FitMode::Inside => resize::fit(image, ctx.original, target),
                    FitMode::Fill => {
                        self.check(ctx, resize::fill_dimensions(ctx.original, target))?;
                        resize::fill(image, ctx.original, target)
                    }
                    FitMode::Outside => resize::resize_exact(image, target.0, target.1),
                }
            }
            Stage::Background(input) => match parse_color(input) {
                Ok(color) => {
                    let canvas = RgbaImage::from_pixel(current.0, current.1, color);
                    overlay_center(&canvas, image, 1.0)
                }
                Err(err) => {
                    warn!(error = %err, "skipping background stage");
                    image.clone()
                }
            },
            Stage::Blur(sigma) => adjust::blur(image, *sigma),
            Stage::Gamma(gamma) => adjust::gamma(image, *gamma),
            Stage::Modulate(m) => {
                let out = adjust::brightness(image, m.brightness);
                let out = adjust::saturation(&out, m.saturation);
                adjust_hue(&out, m.hue)
            }
            Stage::Sharpen(sigma) => adjust::sharpen(image, *sigma),
            Stage::DevicePixelRatio(dpr) => {
                let (w, h) = self.check(ctx, resize::scaled_dimensions(current, *dpr))?;
                resize::resize_exact(image, w, h)
            }
            Stage::ContainBackground {
                color,
                width,
                height,
            } => {
                let color = parse_color(color).map_err(|e| e.in_stage(self.name()))?;
                let (w, h) = self.check(
                    ctx,
                    resize::derive_missing_dimension(current, (*width, *height)),
                )?;
                contain_on_background(image, color, w, h)
            }
            Stage::EnlargementGuard { width, height } => {
                let (orig_w, orig_h) = ctx.original;
                if *width > orig_w || *height > orig_h {
                    resize::resize_exact(image, orig_w, orig_h)
                } else {
                    image.clone()
                }
            }
            Stage::Tint(input) => {
                let color = parse_color(input).map_err(|e| e.in_stage(self.name()))?;
                tint(image, color, TINT_OPACITY)
            }
            Stage::Interlace | Stage::PageSelection { .. } => {
                debug!(stage = self.name(), "unsupported, leaving image unchanged");
                image.clone()
            }
        };

        Ok(out)
    }

    fn check(&self, ctx: &StageContext, size: (u32, u32)) -> Result<(u32, u32)> {
        ctx.limits
            .check(size.0, size.1)
            .map_err(|e| e.in_stage(self.name()))?;
        Ok(size)
    }
}

fn contain_on_background(image: &RgbaImage, color: Rgba<u8>, width: u32, height: u32) -> RgbaImage {
    let resized = resize::resize_exact(image, width, height);
    let canvas = RgbaImage::from_pixel(resized.width(), resized.height(), color);
    paste_center(&canvas, &resized)
}

/// Runs every stage triggered by `params` over `image` with the default limits.
pub fn apply(image: RgbaImage, params: &TransformParams) -> Result<RgbaImage> {
    apply_with_limits(image, params, RenderLimits::default())
}

/// Runs every stage triggered by `params` over `image`.
///
/// A stage whose output would exceed `limits` fails before allocating.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn apply_with_limits(
    image: RgbaImage,
    params: &TransformParams,
    limits: RenderLimits,
) -> Result<RgbaImage> {
    let mut ctx = StageContext::with_limits(image, limits);
    for stage in Stage::plan(params) {
        ctx.image = stage.run(&ctx)?;
        let (width, height) = ctx.image.dimensions();
        debug!(stage = stage.name(), width, height, "applied stage");
    }
    Ok(ctx.image)
}
