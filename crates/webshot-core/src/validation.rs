//! Input validation for capture requests
//!
//! Pure functions that check URLs, viewport dimensions and CSS selectors
//! before any browser work is done.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::{
    capture::constants::{MAX_SCALE_FACTOR, MAX_VIEWPORT_DIMENSION, MIN_SCALE_FACTOR, MIN_VIEWPORT_DIMENSION},
    error::{CaptureError, CaptureResult},
    model::ViewportConfig,
};

/// Selector patterns that are never forwarded to the page
static UNSAFE_SELECTOR_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^javascript:",
        r"(?i)\bon\w+\s*=",
        r"(?i)<script",
        r"(?i)\beval\s*\(",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Parses and canonicalizes an http(s) URL.
///
/// Returns the canonical href. A bare origin such as `https://example.com`
/// is returned without the root slash the URL parser appends, so
/// already-canonical input comes back unchanged.
///
/// # Examples
///
/// ```
/// use webshot_core::validation::validate_url;
///
/// assert_eq!(validate_url("https://example.com").unwrap(), "https://example.com");
/// assert_eq!(validate_url("HTTP://Example.com/a b").unwrap(), "http://example.com/a%20b");
/// assert!(validate_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_url(raw: &str) -> CaptureResult<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|e| CaptureError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(CaptureError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}', only http and https are allowed", other),
            });
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(CaptureError::InvalidUrl {
            url: raw.to_string(),
            reason: "URL has no host".to_string(),
        });
    }

    let href = parsed.as_str();
    let bare_origin = parsed.path() == "/"
        && parsed.query().is_none()
        && parsed.fragment().is_none()
        && !trimmed.ends_with('/');
    if bare_origin {
        Ok(href.trim_end_matches('/').to_string())
    } else {
        Ok(href.to_string())
    }
}

/// Checks optional viewport dimensions against [100, 5000].
///
/// Every violation is collected into a single `InvalidViewport` message.
pub fn validate_viewport(width: Option<u32>, height: Option<u32>) -> CaptureResult<()> {
    let violations = dimension_violations(width, height);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(CaptureError::InvalidViewport {
            reason: violations.join("; "),
        })
    }
}

/// Validates a resolved viewport, including its device scale factor.
pub fn validate_viewport_config(viewport: &ViewportConfig) -> CaptureResult<()> {
    let mut violations = dimension_violations(Some(viewport.width), Some(viewport.height));

    let scale = viewport.device_scale_factor;
    if !(MIN_SCALE_FACTOR..=MAX_SCALE_FACTOR).contains(&scale) {
        violations.push(format!(
            "deviceScaleFactor {} is outside [{}, {}]",
            scale, MIN_SCALE_FACTOR, MAX_SCALE_FACTOR
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(CaptureError::InvalidViewport {
            reason: violations.join("; "),
        })
    }
}

fn dimension_violations(width: Option<u32>, height: Option<u32>) -> Vec<String> {
    let bounds = MIN_VIEWPORT_DIMENSION..=MAX_VIEWPORT_DIMENSION;
    [("width", width), ("height", height)]
        .into_iter()
        .filter_map(|(name, value)| {
            value.filter(|v| !bounds.contains(v)).map(|v| {
                format!(
                    "{} {} is outside [{}, {}]",
                    name, v, MIN_VIEWPORT_DIMENSION, MAX_VIEWPORT_DIMENSION
                )
            })
        })
        .collect()
}

/// Trims a selector and rejects dangerous content.
///
/// - `None` or a blank selector yields `Ok(None)`; callers that need a
///   selector raise `InvalidSelector` themselves.
/// - A selector matching the denylist yields `UnsafeSelector`.
///
/// # Examples
///
/// ```
/// use webshot_core::validation::sanitize_selector;
///
/// assert_eq!(sanitize_selector(Some("  .nav-bar  ")).unwrap().as_deref(), Some(".nav-bar"));
/// assert_eq!(sanitize_selector(None).unwrap(), None);
/// assert!(sanitize_selector(Some("javascript:alert(1)")).is_err());
/// ```
pub fn sanitize_selector(selector: Option<&str>) -> CaptureResult<Option<String>> {
    let Some(trimmed) = selector.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if UNSAFE_SELECTOR_PATTERNS.iter().any(|re| re.is_match(trimmed)) {
        return Err(CaptureError::UnsafeSelector {
            selector: trimmed.to_string(),
        });
    }

    Ok(Some(trimmed.to_string()))
}

/// Sanitizes a selector that must be present.
pub fn require_selector(selector: Option<&str>) -> CaptureResult<String> {
    sanitize_selector(selector)?.ok_or_else(|| CaptureError::InvalidSelector {
        reason: "a non-empty CSS selector is required".to_string(),
    })
}
