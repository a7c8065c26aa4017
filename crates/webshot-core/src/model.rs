//! Data models for web page capture requests and results
//!
//! This module defines the types flowing through the capture pipeline:
//! - Viewport configuration (requested form and resolved form)
//! - Wait conditions and navigation completion conditions
//! - Capture requests for full-page and element screenshots
//! - Capture output and metadata
//!
//! Request types derive `Deserialize` and `JsonSchema` so the MCP layer can
//! use them directly as tool parameters.

use std::borrow::Cow;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    capture::constants::{
        DEFAULT_IDLE_TIME_MS, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH,
        DEFAULT_WAIT_TIMEOUT_MS,
    },
    error::{CaptureError, CaptureResult},
    presets::DevicePreset,
};

/// Resolved viewport applied to a page.
///
/// Built either from a [`DevicePreset`] or from explicit [`ViewportParams`]
/// fields. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewportConfig {
    /// Viewport width in CSS pixels
    pub width: u32,
    /// Viewport height in CSS pixels
    pub height: u32,
    /// Device pixel ratio
    pub device_scale_factor: f64,
    /// Emulate a mobile device (meta viewport, overlay scrollbars)
    pub is_mobile: bool,
    /// Emulate touch input
    pub has_touch: bool,
    /// User-agent override, applied after the viewport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEWPORT_WIDTH,
            height: DEFAULT_VIEWPORT_HEIGHT,
            device_scale_factor: 1.0,
            is_mobile: false,
            has_touch: false,
            user_agent: None,
        }
    }
}

impl From<&DevicePreset> for ViewportConfig {
    fn from(preset: &DevicePreset) -> Self {
        Self {
            width: preset.width,
            height: preset.height,
            device_scale_factor: preset.device_scale_factor,
            is_mobile: preset.is_mobile,
            has_touch: preset.has_touch,
            user_agent: Some(preset.user_agent.to_string()),
        }
    }
}

/// Viewport as requested by a caller.
///
/// If `preset` names a known device preset, the preset is used verbatim and
/// the explicit fields are ignored. Otherwise the explicit fields are used,
/// with defaults for anything left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewportParams {
    /// Device preset name: "mobile", "tablet" or "desktop"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Viewport width in pixels (100-5000, default: 1920)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 100, max = 5000))]
    pub width: Option<u32>,
    /// Viewport height in pixels (100-5000, default: 1080)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 100, max = 5000))]
    pub height: Option<u32>,
    /// Device scale factor (0.1-3, default: 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0.1, max = 3.0))]
    pub device_scale_factor: Option<f64>,
    /// Emulate a mobile device (default: false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mobile: Option<bool>,
    /// Emulate touch input (default: false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_touch: Option<bool>,
    /// Custom user-agent string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ViewportParams {
    /// Shorthand for a preset-only request
    pub fn preset(name: impl Into<String>) -> Self {
        Self {
            preset: Some(name.into()),
            ..Default::default()
        }
    }

    /// Shorthand for an explicit width/height request
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    /// Resolves the request into the viewport that will be applied.
    ///
    /// Unknown preset names fall through to the explicit fields. The result
    /// is not validated here; see [`crate::validation::validate_viewport_config`].
    pub fn resolve(&self) -> ViewportConfig {
        if let Some(preset) = self.preset.as_deref().and_then(DevicePreset::find) {
            return ViewportConfig::from(preset);
        }

        let defaults = ViewportConfig::default();
        ViewportConfig {
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            device_scale_factor: self.device_scale_factor.unwrap_or(defaults.device_scale_factor),
            is_mobile: self.is_mobile.unwrap_or(defaults.is_mobile),
            has_touch: self.has_touch.unwrap_or(defaults.has_touch),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Navigation completion condition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// The `load` event fired
    Load,
    /// The `DOMContentLoaded` event fired
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    /// No network requests in flight for 500ms
    #[serde(rename = "networkidle0")]
    NetworkIdle0,
    /// At most two network requests in flight for 500ms (default)
    #[default]
    #[serde(rename = "networkidle2")]
    NetworkIdle2,
}

impl WaitUntil {
    /// Wire name of the condition
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::Load => "load",
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle0 => "networkidle0",
            WaitUntil::NetworkIdle2 => "networkidle2",
        }
    }

    /// In-flight request budget for the network-idle variants
    pub fn max_inflight(&self) -> Option<usize> {
        match self {
            WaitUntil::NetworkIdle0 => Some(0),
            WaitUntil::NetworkIdle2 => Some(2),
            WaitUntil::Load | WaitUntil::DomContentLoaded => None,
        }
    }
}

impl std::str::FromStr for WaitUntil {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "load" => Ok(WaitUntil::Load),
            "domcontentloaded" => Ok(WaitUntil::DomContentLoaded),
            "networkidle0" => Ok(WaitUntil::NetworkIdle0),
            "networkidle2" => Ok(WaitUntil::NetworkIdle2),
            other => Err(CaptureError::InvalidWaitCondition {
                kind: "waitUntil".to_string(),
                reason: format!(
                    "'{}' is not one of load, domcontentloaded, networkidle0, networkidle2",
                    other
                ),
            }),
        }
    }
}

impl std::fmt::Display for WaitUntil {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of post-navigation wait condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WaitKind {
    /// Wait for a CSS selector to match
    Selector,
    /// Wait for a JavaScript predicate to become truthy
    Function,
    /// Sleep for a fixed number of milliseconds
    Timeout,
    /// Wait for network activity to go quiet
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

impl WaitKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitKind::Selector => "selector",
            WaitKind::Function => "function",
            WaitKind::Timeout => "timeout",
            WaitKind::NetworkIdle => "networkidle",
        }
    }
}

impl std::str::FromStr for WaitKind {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "selector" => Ok(WaitKind::Selector),
            "function" => Ok(WaitKind::Function),
            "timeout" => Ok(WaitKind::Timeout),
            "networkidle" => Ok(WaitKind::NetworkIdle),
            other => Err(CaptureError::InvalidWaitCondition {
                kind: other.to_string(),
                reason: "expected selector, function, timeout or networkidle".to_string(),
            }),
        }
    }
}

/// Raw `waitFor.value`: callers send durations either as JSON numbers or
/// as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum WaitValue {
    /// Selector, predicate source, or a millisecond count written as text
    Text(String),
    /// Millisecond count
    Millis(u64),
}

impl WaitValue {
    /// The value as text, with surrounding whitespace removed
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            WaitValue::Text(text) => Cow::Borrowed(text.trim()),
            WaitValue::Millis(ms) => Cow::Owned(ms.to_string()),
        }
    }

    fn millis(&self) -> Option<u64> {
        match self {
            WaitValue::Text(text) => text.trim().parse().ok(),
            WaitValue::Millis(ms) => Some(*ms),
        }
    }
}

impl From<String> for WaitValue {
    fn from(text: String) -> Self {
        WaitValue::Text(text)
    }
}

impl From<&str> for WaitValue {
    fn from(text: &str) -> Self {
        WaitValue::Text(text.to_string())
    }
}

impl From<u64> for WaitValue {
    fn from(ms: u64) -> Self {
        WaitValue::Millis(ms)
    }
}

/// Wait condition as requested by a caller.
///
/// `value` means different things per kind: a selector, a predicate
/// expression, a duration in milliseconds, or an idle threshold in
/// milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WaitFor {
    /// Wait condition type
    #[serde(rename = "type")]
    pub kind: WaitKind,
    /// Selector, predicate, duration (ms) or idle threshold (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<WaitValue>,
    /// Overall wait timeout in milliseconds (default: 10000)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Network idle threshold in milliseconds (networkidle only, default: 2000)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_time: Option<u64>,
}

impl WaitFor {
    /// Creates a wait request of `kind` with `value`
    pub fn new(kind: WaitKind, value: impl Into<WaitValue>) -> Self {
        Self {
            kind,
            value: Some(value.into()),
            timeout: None,
            idle_time: None,
        }
    }

    /// Sets the overall timeout
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }

    /// Sets the network idle threshold
    pub fn with_idle_time(mut self, idle_ms: u64) -> Self {
        self.idle_time = Some(idle_ms);
        self
    }

    /// Resolves the request into an executable [`WaitCondition`].
    ///
    /// The selector is passed through untouched here; it is sanitized when
    /// the wait actually runs.
    pub fn resolve(&self) -> CaptureResult<WaitCondition> {
        let timeout_ms = self.timeout.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS);
        let value = self.value.as_ref().filter(|v| !v.as_text().is_empty());

        let invalid = |reason: String| CaptureError::InvalidWaitCondition {
            kind: self.kind.as_str().to_string(),
            reason,
        };

        match self.kind {
            WaitKind::Selector => Ok(WaitCondition::Selector {
                selector: self.value.as_ref().map(|v| v.as_text().into_owned()),
                timeout_ms,
            }),
            WaitKind::Function => {
                let expression = value
                    .ok_or_else(|| invalid("a predicate expression is required".to_string()))?;
                Ok(WaitCondition::Function {
                    expression: expression.as_text().into_owned(),
                    timeout_ms,
                })
            }
            WaitKind::Timeout => {
                let raw = value
                    .ok_or_else(|| invalid("a duration in milliseconds is required".to_string()))?;
                let duration_ms = raw.millis().ok_or_else(|| {
                    invalid(format!("'{}' is not an integer millisecond count", raw.as_text()))
                })?;
                Ok(WaitCondition::Delay { duration_ms })
            }
            WaitKind::NetworkIdle => {
                let idle_ms = match value {
                    Some(raw) => raw.millis().ok_or_else(|| {
                        invalid(format!("'{}' is not an integer idle threshold", raw.as_text()))
                    })?,
                    None => self.idle_time.unwrap_or(DEFAULT_IDLE_TIME_MS),
                };
                Ok(WaitCondition::NetworkIdle {
                    idle_ms,
                    timeout_ms,
                })
            }
        }
    }
}

/// Executable wait condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// Block until `selector` matches an element
    Selector {
        /// Unsanitized selector; `None` when the caller gave no value
        selector: Option<String>,
        /// Overall deadline
        timeout_ms: u64,
    },
    /// Block until `expression` evaluates truthy in the page
    Function {
        /// Predicate source
        expression: String,
        /// Overall deadline
        timeout_ms: u64,
    },
    /// Sleep for a fixed duration
    Delay {
        /// Duration to sleep
        duration_ms: u64,
    },
    /// Block until no request/response has been observed for `idle_ms`
    NetworkIdle {
        /// Required quiet period
        idle_ms: u64,
        /// Overall deadline
        timeout_ms: u64,
    },
}

fn default_true() -> bool {
    true
}

/// Full-page capture request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    /// URL to capture (http or https)
    pub url: String,
    /// Viewport configuration (preset or explicit fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportParams>,
    /// Condition to wait for after navigation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<WaitFor>,
    /// Extra delay in milliseconds before capturing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    /// Navigation completion condition (default: networkidle2)
    #[serde(default)]
    pub wait_until: WaitUntil,
    /// Apply the 2500ms post-navigation stability delay (default: true)
    #[serde(default = "default_true")]
    pub standard_delay: bool,
}

impl CaptureRequest {
    /// Creates a request for `url` with all defaults
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            viewport: None,
            wait_for: None,
            delay: None,
            wait_until: WaitUntil::default(),
            standard_delay: true,
        }
    }

    /// Sets the viewport
    pub fn with_viewport(mut self, viewport: ViewportParams) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Sets the wait condition
    pub fn with_wait_for(mut self, wait_for: WaitFor) -> Self {
        self.wait_for = Some(wait_for);
        self
    }

    /// Sets the extra delay
    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay = Some(delay_ms);
        self
    }

    /// Sets the navigation completion condition
    pub fn with_wait_until(mut self, wait_until: WaitUntil) -> Self {
        self.wait_until = wait_until;
        self
    }

    /// Enables or disables the stability delay
    pub fn with_standard_delay(mut self, enabled: bool) -> Self {
        self.standard_delay = enabled;
        self
    }
}

/// Options for element capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ElementCaptureOptions {
    /// Viewport configuration (preset or explicit fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportParams>,
    /// Extra delay in milliseconds before capturing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    /// Apply the 2500ms post-navigation stability delay (default: true)
    #[serde(default = "default_true")]
    pub standard_delay: bool,
}

impl Default for ElementCaptureOptions {
    fn default() -> Self {
        Self {
            viewport: None,
            delay: None,
            standard_delay: true,
        }
    }
}

/// Metadata describing a finished capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMetadata {
    /// Validated URL that was captured
    pub url: String,
    /// RFC 3339 capture timestamp
    pub timestamp: String,
    /// Viewport applied to the page (full-page capture only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportConfig>,
    /// Document title (full-page capture only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Final image width in pixels
    pub image_width: u32,
    /// Final image height in pixels
    pub image_height: u32,
    /// Selector that was captured (element capture only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// Result of a successful capture
#[derive(Debug, Clone)]
pub struct CaptureOutput {
    /// Always true for a returned output; failures are errors
    pub success: bool,
    /// PNG-encoded image bytes (possibly downscaled)
    pub data: Vec<u8>,
    /// Capture metadata
    pub metadata: CaptureMetadata,
}

impl CaptureOutput {
    /// Final image dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.metadata.image_width, self.metadata.image_height)
    }
}
