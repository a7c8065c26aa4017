//! MCP content builders for capture results
//!
//! Converts capture output and capture errors into MCP tool responses. A
//! successful capture becomes an inline PNG followed by a JSON metadata text
//! part; a failed capture becomes an error-flagged result whose text parts
//! carry the error code, a remediation hint and a machine-readable hint.
//!
//! # Examples
//!
//! ```
//! use webshot_core::error::CaptureError;
//! use webshot_mcp_server::mcp_content::build_error_result;
//!
//! let error = CaptureError::ElementNotFound {
//!     selector: "#missing".to_string(),
//! };
//! let result = build_error_result(&error);
//!
//! assert_eq!(result.is_error, Some(true));
//! assert_eq!(result.content.len(), 3);
//! ```

use base64::{Engine, engine::general_purpose::STANDARD};
use rmcp::model::{CallToolResult, Content};
use tracing::warn;
use webshot_core::{
    error::CaptureError,
    model::CaptureOutput,
    presets::{DevicePreset, format_presets},
};

/// MIME type of every image this server returns
pub const PNG_MIME_TYPE: &str = "image/png";

/// Builds MCP image content from raw image bytes
///
/// # Examples
///
/// ```
/// use webshot_mcp_server::mcp_content::build_image_content;
///
/// let png_signature = vec![137, 80, 78, 71, 13, 10, 26, 10];
/// let content = build_image_content(&png_signature, "image/png");
///
/// assert!(content.as_image().is_some());
/// ```
pub fn build_image_content(data: &[u8], mime_type: &str) -> Content {
    Content::image(STANDARD.encode(data), mime_type)
}

/// Builds the success response for a capture: image first, then metadata.
pub fn build_capture_result(output: &CaptureOutput) -> CallToolResult {
    let mut content = vec![build_image_content(&output.data, PNG_MIME_TYPE)];

    match serde_json::to_string_pretty(&output.metadata) {
        Ok(json) => content.push(Content::text(json)),
        Err(e) => warn!(error = %e, "Failed to serialize capture metadata"),
    }

    CallToolResult::success(content)
}

/// Builds the error response for a failed capture.
///
/// The result is flagged `is_error` and never surfaces as a protocol fault.
/// Text parts, in order:
///
/// 1. `Error [CODE]: message`
/// 2. The remediation hint
/// 3. The structured hint as JSON, for clients that recover automatically
pub fn build_error_result(error: &CaptureError) -> CallToolResult {
    let mut content = vec![
        Content::text(format!("Error [{}]: {}", error.code(), error)),
        Content::text(format!("Hint: {}", error.remediation_hint())),
    ];

    match serde_json::to_string(&error.structured_hint()) {
        Ok(json) => content.push(Content::text(json)),
        Err(e) => warn!(error = %e, "Failed to serialize error hint"),
    }

    CallToolResult::error(content)
}

/// Builds the `list_device_presets` response: a readable table, then the
/// preset table as JSON.
pub fn build_presets_result() -> CallToolResult {
    let mut content = vec![Content::text(format_presets())];

    match serde_json::to_string_pretty(DevicePreset::all()) {
        Ok(json) => content.push(Content::text(json)),
        Err(e) => warn!(error = %e, "Failed to serialize device presets"),
    }

    CallToolResult::success(content)
}
