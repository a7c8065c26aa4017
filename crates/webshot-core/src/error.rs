//! Error types for web page screenshot capture
//!
//! This module defines the error model shared by the validation utilities,
//! the capture engines and the orchestrator. Every error carries a
//! human-readable message, a stable machine-readable code and an actionable
//! remediation hint.
//!
//! # Structured Error Hints
//!
//! In addition to prose hints, errors provide structured metadata via
//! [`ErrorHint`] so that AI clients can attempt recovery without parsing
//! prose:
//!
//! ```rust,ignore
//! let error = CaptureError::InvalidViewport { reason };
//! let hint = error.structured_hint();
//!
//! if let Some(tool) = hint.suggested_tool {
//!     println!("Try calling: {}", tool);
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Structured error hint for LLM auto-recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHint {
    /// Machine-readable error code (same as [`CaptureError::code`])
    pub code: String,

    /// Human-readable description of how to fix the error
    pub message: String,

    /// Category of recovery action to attempt
    pub recovery_action: RecoveryAction,

    /// MCP tool name to call for recovery (if applicable)
    pub suggested_tool: Option<String>,

    /// Whether the error is likely transient (retry may succeed)
    pub is_transient: bool,

    /// Error category for grouping/filtering
    pub category: ErrorCategory,
}

/// Category of recovery action an LLM client can attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Call a different tool to get more information
    CallTool,
    /// Retry the same operation later
    Retry,
    /// Modify parameters and retry
    ModifyParams,
    /// No automated recovery possible
    None,
}

/// High-level error category for filtering and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Target not found (element)
    NotFound,
    /// Invalid parameters or configuration
    InvalidInput,
    /// Concurrency ceiling reached
    RateLimited,
    /// Operation timed out
    Timeout,
    /// Browser engine failure
    BrowserError,
    /// Image decoding or resizing error
    ProcessingError,
}

/// Error type for screenshot capture operations
///
/// Validation variants are raised before any browser work happens. Failures
/// during a full-page capture are wrapped in [`CaptureError::CaptureFailed`],
/// which keeps the inner error so callers can still branch on its kind via
/// [`CaptureError::inner_kind`].
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// URL could not be parsed or uses a scheme other than http/https
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected input
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Viewport dimensions or scale factor are out of range
    #[error("Invalid viewport: {reason}")]
    InvalidViewport {
        /// All violations, joined into one message
        reason: String,
    },

    /// A selector was required but missing or empty
    #[error("Invalid selector: {reason}")]
    InvalidSelector {
        /// Why the selector is unusable
        reason: String,
    },

    /// Selector matched the dangerous-pattern denylist
    #[error("Unsafe selector '{selector}': contains a disallowed pattern")]
    UnsafeSelector {
        /// The rejected selector (trimmed)
        selector: String,
    },

    /// Wait condition is missing a value or has an unparseable one
    #[error("Invalid wait condition '{kind}': {reason}")]
    InvalidWaitCondition {
        /// Wait condition type (selector, function, timeout, networkidle)
        kind: String,
        /// Why it is invalid
        reason: String,
    },

    /// Too many full-page captures are already in flight
    #[error("Rate limit exceeded: {max_concurrent} captures already in progress")]
    RateLimitExceeded {
        /// Configured concurrency ceiling
        max_concurrent: usize,
    },

    /// No element on the page matches the selector
    #[error("Element not found: no element matches selector '{selector}'")]
    ElementNotFound {
        /// Selector that matched nothing
        selector: String,
    },

    /// Captured bytes could not be decoded to read their dimensions
    #[error("Failed to read image metadata: {reason}")]
    ImageMetadataError {
        /// Decoder error
        reason: String,
    },

    /// Oversized capture could not be resized or re-encoded
    #[error("Failed to resize image from {width}x{height}: {reason}")]
    ImageResizeError {
        /// Original width
        width: u32,
        /// Original height
        height: u32,
        /// Encoder/resizer error
        reason: String,
    },

    /// A wait or navigation deadline elapsed
    #[error("Timed out after {duration_ms}ms waiting for {operation}")]
    Timeout {
        /// What was being waited on
        operation: String,
        /// The deadline that elapsed
        duration_ms: u64,
    },

    /// The browser engine reported a failure
    #[error("Browser {operation} failed: {reason}")]
    Browser {
        /// Engine operation (launch, new_page, navigate, screenshot, ...)
        operation: String,
        /// Engine error message
        reason: String,
    },

    /// Configuration value is unusable
    #[error("Invalid configuration '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Why it is invalid
        reason: String,
    },

    /// Outer wrapper for any failure during a full-page capture
    #[error("Failed to capture screenshot of {url}: {source}")]
    CaptureFailed {
        /// The URL as originally requested
        url: String,
        /// The failure that aborted the capture
        #[source]
        source: Box<CaptureError>,
    },
}

impl CaptureError {
    /// Creates a [`CaptureError::Browser`] from any displayable engine error.
    pub fn browser(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        CaptureError::Browser {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Wraps an error as [`CaptureError::CaptureFailed`] for `url`.
    ///
    /// Already-wrapped errors are returned unchanged so the wrapper never
    /// nests.
    pub fn capture_failed(url: impl Into<String>, source: CaptureError) -> Self {
        match source {
            already @ CaptureError::CaptureFailed { .. } => already,
            source => CaptureError::CaptureFailed {
                url: url.into(),
                source: Box::new(source),
            },
        }
    }

    /// Returns the innermost error, looking through `CaptureFailed`.
    ///
    /// # Examples
    ///
    /// ```
    /// use webshot_core::error::CaptureError;
    ///
    /// let inner = CaptureError::ElementNotFound { selector: "#x".into() };
    /// let wrapped = CaptureError::capture_failed("https://example.com", inner);
    ///
    /// assert_eq!(wrapped.code(), "CAPTURE_FAILED");
    /// assert_eq!(wrapped.inner_kind().code(), "ELEMENT_NOT_FOUND");
    /// ```
    pub fn inner_kind(&self) -> &CaptureError {
        match self {
            CaptureError::CaptureFailed { source, .. } => source.inner_kind(),
            other => other,
        }
    }

    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::InvalidUrl { .. } => "INVALID_URL",
            CaptureError::InvalidViewport { .. } => "INVALID_VIEWPORT",
            CaptureError::InvalidSelector { .. } => "INVALID_SELECTOR",
            CaptureError::UnsafeSelector { .. } => "UNSAFE_SELECTOR",
            CaptureError::InvalidWaitCondition { .. } => "INVALID_WAIT_CONDITION",
            CaptureError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            CaptureError::ElementNotFound { .. } => "ELEMENT_NOT_FOUND",
            CaptureError::ImageMetadataError { .. } => "IMAGE_METADATA_ERROR",
            CaptureError::ImageResizeError { .. } => "IMAGE_RESIZE_ERROR",
            CaptureError::Timeout { .. } => "TIMEOUT",
            CaptureError::Browser { .. } => "BROWSER_ERROR",
            CaptureError::InvalidConfig { .. } => "INVALID_CONFIG",
            CaptureError::CaptureFailed { .. } => "CAPTURE_FAILED",
        }
    }

    /// Returns an actionable remediation hint for this error
    ///
    /// `CaptureFailed` defers to its inner error, since that is where the
    /// actionable detail lives.
    ///
    /// # Examples
    ///
    /// ```
    /// use webshot_core::error::CaptureError;
    ///
    /// let error = CaptureError::InvalidViewport {
    ///     reason: "width 50 is outside [100, 5000]".to_string(),
    /// };
    ///
    /// assert!(error.remediation_hint().contains("list_device_presets"));
    /// ```
    pub fn remediation_hint(&self) -> &str {
        match self {
            CaptureError::InvalidUrl { .. } => {
                "Provide an absolute URL using the http or https scheme, for example \
                 https://example.com."
            }
            CaptureError::InvalidViewport { .. } => {
                "Width and height must be between 100 and 5000 pixels and the device scale \
                 factor between 0.1 and 3. Use list_device_presets to pick a known-good preset."
            }
            CaptureError::InvalidSelector { .. } => {
                "Provide a non-empty CSS selector such as '#main' or '.nav-bar'."
            }
            CaptureError::UnsafeSelector { .. } => {
                "Selectors may not contain javascript: URLs, inline event handlers, script tags \
                 or eval calls. Use a plain CSS selector."
            }
            CaptureError::InvalidWaitCondition { kind, .. } => match kind.as_str() {
                "timeout" => "The timeout wait condition needs an integer number of milliseconds.",
                "networkidle" => {
                    "The networkidle wait condition takes an optional integer idle threshold in \
                     milliseconds."
                }
                _ => "Provide a value for the wait condition.",
            },
            CaptureError::RateLimitExceeded { .. } => {
                "Too many captures are running. Wait for in-flight captures to finish and try \
                 again."
            }
            CaptureError::ElementNotFound { .. } => {
                "Check the selector against the page. The element may render late; consider a \
                 full-page capture with a selector wait condition first."
            }
            CaptureError::ImageMetadataError { .. } => {
                "The browser returned bytes that are not a decodable PNG. Retry the capture."
            }
            CaptureError::ImageResizeError { .. } => {
                "The capture was too large to downscale. Use a smaller viewport or capture a \
                 single element instead."
            }
            CaptureError::Timeout { .. } => {
                "The page did not reach the requested state in time. Increase the wait timeout, \
                 use a less strict waitUntil value, or retry."
            }
            CaptureError::Browser { operation, .. } => match operation.as_str() {
                "launch" => {
                    "Chrome or Chromium could not be started. Install it or point \
                     WEBSHOT_CHROME_PATH at the executable."
                }
                "navigate" => "Navigation failed. Check that the URL is reachable.",
                _ => "The browser reported an error. Retry the capture.",
            },
            CaptureError::InvalidConfig { .. } => {
                "Check the WEBSHOT_* environment variables against the documented ranges."
            }
            CaptureError::CaptureFailed { source, .. } => source.remediation_hint(),
        }
    }

    /// Returns a structured error hint for LLM auto-recovery.
    ///
    /// # Example
    ///
    /// ```
    /// use webshot_core::error::{CaptureError, RecoveryAction};
    ///
    /// let error = CaptureError::RateLimitExceeded { max_concurrent: 5 };
    /// let hint = error.structured_hint();
    ///
    /// assert_eq!(hint.recovery_action, RecoveryAction::Retry);
    /// assert!(hint.is_transient);
    /// ```
    pub fn structured_hint(&self) -> ErrorHint {
        let kind = self.inner_kind();
        let (recovery_action, suggested_tool, is_transient, category) = match kind {
            CaptureError::InvalidViewport { .. } => (
                RecoveryAction::CallTool,
                Some("list_device_presets"),
                false,
                ErrorCategory::InvalidInput,
            ),
            CaptureError::InvalidUrl { .. }
            | CaptureError::InvalidSelector { .. }
            | CaptureError::UnsafeSelector { .. }
            | CaptureError::InvalidWaitCondition { .. } => {
                (RecoveryAction::ModifyParams, None, false, ErrorCategory::InvalidInput)
            }
            CaptureError::InvalidConfig { .. } => {
                (RecoveryAction::None, None, false, ErrorCategory::InvalidInput)
            }
            CaptureError::RateLimitExceeded { .. } => {
                (RecoveryAction::Retry, None, true, ErrorCategory::RateLimited)
            }
            CaptureError::ElementNotFound { .. } => (
                RecoveryAction::CallTool,
                Some("take_screenshot"),
                false,
                ErrorCategory::NotFound,
            ),
            CaptureError::ImageMetadataError { .. } => {
                (RecoveryAction::Retry, None, true, ErrorCategory::ProcessingError)
            }
            CaptureError::ImageResizeError { .. } => {
                (RecoveryAction::ModifyParams, None, false, ErrorCategory::ProcessingError)
            }
            CaptureError::Timeout { .. } => {
                (RecoveryAction::ModifyParams, None, true, ErrorCategory::Timeout)
            }
            CaptureError::Browser { .. } | CaptureError::CaptureFailed { .. } => {
                (RecoveryAction::Retry, None, true, ErrorCategory::BrowserError)
            }
        };

        ErrorHint {
            code: self.code().to_string(),
            message: self.remediation_hint().to_string(),
            recovery_action,
            suggested_tool: suggested_tool.map(str::to_string),
            is_transient,
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_message() {
        let error = CaptureError::InvalidUrl {
            url: "ftp://example.com".to_string(),
            reason: "unsupported scheme 'ftp'".to_string(),
        };

        let msg = error.to_string();
        assert!(msg.contains("ftp://example.com"));
        assert!(msg.contains("unsupported scheme"));
        assert_eq!(error.code(), "INVALID_URL");
    }

    #[test]
    fn test_element_not_found_names_selector() {
        let error = CaptureError::ElementNotFound {
            selector: "#missing".to_string(),
        };

        assert!(error.to_string().contains("#missing"));
        assert_eq!(error.code(), "ELEMENT_NOT_FOUND");
    }

    #[test]
    fn test_capture_failed_keeps_inner_error() {
        let inner = CaptureError::Timeout {
            operation: "selector '#app'".to_string(),
            duration_ms: 10_000,
        };
        let error = CaptureError::capture_failed("https://example.com", inner);

        let msg = error.to_string();
        assert!(msg.contains("https://example.com"));
        assert!(msg.contains("10000ms"));
        assert_eq!(error.code(), "CAPTURE_FAILED");
        assert!(matches!(error.inner_kind(), CaptureError::Timeout { .. }));
    }

    #[test]
    fn test_capture_failed_does_not_nest() {
        let inner = CaptureError::browser("screenshot", "target closed");
        let once = CaptureError::capture_failed("https://a.example", inner);
        let twice = CaptureError::capture_failed("https://b.example", once);

        match twice {
            CaptureError::CaptureFailed { url, source } => {
                assert_eq!(url, "https://a.example");
                assert!(matches!(*source, CaptureError::Browser { .. }));
            }
            other => panic!("expected CaptureFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_std_error_source_chain() {
        use std::error::Error;

        let error = CaptureError::capture_failed(
            "https://example.com",
            CaptureError::ImageMetadataError {
                reason: "bad magic".to_string(),
            },
        );

        let source = error.source().expect("wrapper should expose its source");
        assert!(source.to_string().contains("bad magic"));
    }

    #[test]
    fn test_codes_are_unique() {
        let errors = vec![
            CaptureError::InvalidUrl { url: String::new(), reason: String::new() },
            CaptureError::InvalidViewport { reason: String::new() },
            CaptureError::InvalidSelector { reason: String::new() },
            CaptureError::UnsafeSelector { selector: String::new() },
            CaptureError::InvalidWaitCondition { kind: String::new(), reason: String::new() },
            CaptureError::RateLimitExceeded { max_concurrent: 1 },
            CaptureError::ElementNotFound { selector: String::new() },
            CaptureError::ImageMetadataError { reason: String::new() },
            CaptureError::ImageResizeError { width: 1, height: 1, reason: String::new() },
            CaptureError::Timeout { operation: String::new(), duration_ms: 1 },
            CaptureError::browser("launch", ""),
            CaptureError::InvalidConfig { key: String::new(), reason: String::new() },
        ];

        let mut codes: Vec<_> = errors.iter().map(CaptureError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_remediation_hints_not_empty() {
        let errors = vec![
            CaptureError::UnsafeSelector { selector: "x".into() },
            CaptureError::InvalidWaitCondition { kind: "timeout".into(), reason: "x".into() },
            CaptureError::browser("launch", "no chrome"),
            CaptureError::browser("navigate", "net::ERR_NAME_NOT_RESOLVED"),
        ];

        for error in errors {
            assert!(!error.remediation_hint().is_empty(), "{error:?} has no hint");
        }
    }

    #[test]
    fn test_wrapped_hint_uses_inner_kind() {
        let error = CaptureError::capture_failed(
            "https://example.com",
            CaptureError::InvalidViewport {
                reason: "width 50".to_string(),
            },
        );

        let hint = error.structured_hint();
        assert_eq!(hint.code, "CAPTURE_FAILED");
        assert_eq!(hint.recovery_action, RecoveryAction::CallTool);
        assert_eq!(hint.suggested_tool.as_deref(), Some("list_device_presets"));
        assert_eq!(hint.category, ErrorCategory::InvalidInput);
    }

    #[test]
    fn test_rate_limit_hint_is_transient() {
        let hint = CaptureError::RateLimitExceeded { max_concurrent: 5 }.structured_hint();

        assert!(hint.is_transient);
        assert_eq!(hint.category, ErrorCategory::RateLimited);
    }

    #[test]
    fn test_hint_serializes_snake_case() {
        let hint = CaptureError::ElementNotFound {
            selector: "#x".into(),
        }
        .structured_hint();

        let json = serde_json::to_string(&hint).expect("hint should serialize");
        assert!(json.contains("call_tool"));
        assert!(json.contains("not_found"));
        assert!(json.contains("take_screenshot"));
    }
}
