//! Pixel operations used by the transform pipeline and the text renderer.
//!
//! Every function takes its input by reference and returns a new image, so
//! stages can be composed and tested in isolation.

pub mod adjust;
pub mod composite;
pub mod hue;
pub mod resize;

pub use composite::{overlay, overlay_center, paste_center, tint};
pub use hue::{adjust_hue, hsl_to_rgb, hue_to_rgb, rgb_to_hsl};
