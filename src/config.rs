//! Fetch and render limits, read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `IMGOPT_FETCH_TIMEOUT_SECS` | `10` |
//! | `IMGOPT_MAX_BODY_BYTES` | `26214400` (25 MiB) |
//! | `IMGOPT_USER_AGENT` | `imgopt-renderer/<version>` |
//! | `IMGOPT_MAX_DIMENSION` | `16384` |
//! | `IMGOPT_MAX_PIXELS` | `67108864` (256 MiB of RGBA) |

use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};

pub const TIMEOUT_ENV_VAR: &str = "IMGOPT_FETCH_TIMEOUT_SECS";
pub const MAX_BODY_ENV_VAR: &str = "IMGOPT_MAX_BODY_BYTES";
pub const USER_AGENT_ENV_VAR: &str = "IMGOPT_USER_AGENT";
pub const MAX_DIMENSION_ENV_VAR: &str = "IMGOPT_MAX_DIMENSION";
pub const MAX_PIXELS_ENV_VAR: &str = "IMGOPT_MAX_PIXELS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_BODY_BYTES: u64 = 25 * 1024 * 1024;
pub const DEFAULT_MAX_DIMENSION: u32 = 16_384;
pub const DEFAULT_MAX_PIXELS: u64 = 64 * 1024 * 1024;

/// Limits applied to every source image download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchConfig {
    /// Whole-request timeout, connect included.
    pub timeout: Duration,
    /// Bodies larger than this are rejected.
    pub max_body_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Unset, empty or unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let timeout = positive(&lookup, TIMEOUT_ENV_VAR)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let max_body_bytes = positive(&lookup, MAX_BODY_ENV_VAR).unwrap_or(defaults.max_body_bytes);
        let user_agent = lookup(USER_AGENT_ENV_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.user_agent);

        Self {
            timeout,
            max_body_bytes,
            user_agent,
        }
    }
}

/// Upper bounds on the size of any image the renderer allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderLimits {
    /// Longest allowed side, in pixels.
    pub max_dimension: u32,
    /// Largest allowed `width * height`.
    pub max_pixels: u64,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl RenderLimits {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset, zero or unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_dimension: positive(&lookup, MAX_DIMENSION_ENV_VAR)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.max_dimension),
            max_pixels: positive(&lookup, MAX_PIXELS_ENV_VAR).unwrap_or(defaults.max_pixels),
        }
    }

    /// Fails with [`Error::TooLarge`] when a `width` x `height` image is over the limits.
    pub fn check(&self, width: u32, height: u32) -> Result<()> {
        let pixels = width as u64 * height as u64;
        if width > self.max_dimension || height > self.max_dimension || pixels > self.max_pixels {
            return Err(Error::TooLarge {
                width,
                height,
                max_dimension: self.max_dimension,
                max_pixels: self.max_pixels,
            });
        }
        Ok(())
    }
}

fn positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

fn default_user_agent() -> String {
    format!("imgopt-renderer/{}", env!("CARGO_PKG_VERSION"))
}
