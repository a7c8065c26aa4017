//! Runtime configuration for the capture orchestrator
//!
//! Configuration is read once at startup, from environment variables with
//! built-in defaults, and is immutable afterwards.

use std::{path::PathBuf, str::FromStr};

use serde::Serialize;
use tracing::warn;

use crate::{
    capture::constants::{
        DEFAULT_MAX_CONCURRENT, DEFAULT_TIMEOUT_MS, MAX_IMAGE_DIMENSION, STABILITY_DELAY_MS,
    },
    error::{CaptureError, CaptureResult},
};

/// Environment variable selecting headless mode
pub const ENV_HEADLESS: &str = "WEBSHOT_HEADLESS";
/// Environment variable for the navigation timeout in milliseconds
pub const ENV_TIMEOUT_MS: &str = "WEBSHOT_TIMEOUT_MS";
/// Environment variable for the admission ceiling
pub const ENV_MAX_CONCURRENT: &str = "WEBSHOT_MAX_CONCURRENT";
/// Environment variable for the browser executable path
pub const ENV_CHROME_PATH: &str = "WEBSHOT_CHROME_PATH";
/// Environment variable for the output image cap
pub const ENV_MAX_IMAGE_DIMENSION: &str = "WEBSHOT_MAX_IMAGE_DIMENSION";

/// Capture orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    /// Run the browser without a visible window
    pub headless: bool,
    /// Timeout for navigation and generic waits, in milliseconds
    pub timeout_ms: u64,
    /// Maximum number of simultaneous full-page captures
    pub max_concurrent: usize,
    /// Browser executable; auto-detected when `None`
    pub chrome_executable: Option<PathBuf>,
    /// Largest width or height of a returned image
    pub max_image_dimension: u32,
    /// Post-navigation stability delay in milliseconds
    pub stability_delay_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            headless: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            chrome_executable: None,
            max_image_dimension: MAX_IMAGE_DIMENSION,
            stability_delay_ms: STABILITY_DELAY_MS,
        }
    }
}

impl CaptureConfig {
    /// Builds a configuration from the environment.
    ///
    /// Unset variables use the defaults. Set but unparseable values also use
    /// the defaults and log a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            headless: env_override(ENV_HEADLESS, defaults.headless, parse_bool),
            timeout_ms: env_override(ENV_TIMEOUT_MS, defaults.timeout_ms, parse_number),
            max_concurrent: env_override(
                ENV_MAX_CONCURRENT,
                defaults.max_concurrent,
                parse_number,
            ),
            chrome_executable: std::env::var_os(ENV_CHROME_PATH)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            max_image_dimension: env_override(
                ENV_MAX_IMAGE_DIMENSION,
                defaults.max_image_dimension,
                parse_number,
            ),
            stability_delay_ms: defaults.stability_delay_ms,
        }
    }

    /// Rejects values that would make every capture fail
    pub fn validate(&self) -> CaptureResult<()> {
        if self.max_concurrent == 0 {
            return Err(CaptureError::InvalidConfig {
                key: "max_concurrent".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.timeout_ms == 0 {
            return Err(CaptureError::InvalidConfig {
                key: "timeout_ms".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.max_image_dimension == 0 {
            return Err(CaptureError::InvalidConfig {
                key: "max_image_dimension".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_executable = Some(path.into());
        self
    }

    pub fn with_max_image_dimension(mut self, max_dimension: u32) -> Self {
        self.max_image_dimension = max_dimension;
        self
    }

    /// Overrides the stability delay; tests use 0 to skip it
    pub fn with_stability_delay_ms(mut self, delay_ms: u64) -> Self {
        self.stability_delay_ms = delay_ms;
        self
    }
}

fn env_override<T, F>(key: &str, default: T, parse: F) -> T
where
    T: std::fmt::Debug,
    F: Fn(&str) -> Option<T>,
{
    match std::env::var(key) {
        Ok(raw) => parse(raw.trim()).unwrap_or_else(|| {
            warn!(
                key,
                value = %raw,
                default = ?default,
                "Ignoring unparseable configuration override"
            );
            default
        }),
        Err(_) => default,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_number<T: FromStr>(raw: &str) -> Option<T> {
    raw.parse().ok()
}
