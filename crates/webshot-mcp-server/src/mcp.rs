//! MCP service implementation with tool routing
//!
//! This module provides the webshot MCP server: three tools that capture web
//! pages through a shared headless browser.

use std::sync::Arc;

use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ErrorData as McpError, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::mcp_content::{build_capture_result, build_error_result, build_presets_result};
use webshot_core::{
    CaptureConfig, CaptureOrchestrator,
    capture::mock::{MockLauncher, MockPageConfig},
    error::CaptureResult,
    model::{CaptureOutput, CaptureRequest, ElementCaptureOptions, ViewportParams},
};

const SERVER_INSTRUCTIONS: &str = "Captures screenshots of web pages with a headless browser. \
    Use take_screenshot for a full page, take_element_screenshot for a single element matched \
    by a CSS selector, and list_device_presets to see the mobile, tablet and desktop viewports.";

/// Parameters for the take_element_screenshot tool
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TakeElementScreenshotParams {
    /// URL to capture (http or https)
    pub url: String,
    /// CSS selector of the element to capture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Viewport configuration (preset or explicit fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportParams>,
    /// Extra delay in milliseconds before capturing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    /// Apply the 2500ms post-navigation stability delay (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_delay: Option<bool>,
}

impl TakeElementScreenshotParams {
    fn options(&self) -> ElementCaptureOptions {
        ElementCaptureOptions {
            viewport: self.viewport.clone(),
            delay: self.delay,
            standard_delay: self.standard_delay.unwrap_or(true),
        }
    }
}

/// Webshot MCP server
///
/// # Tools
///
/// - `take_screenshot`: Full-page capture with viewport, wait and delay options
/// - `take_element_screenshot`: Capture of the first element matching a selector
/// - `list_device_presets`: The built-in viewport presets
#[derive(Clone)]
pub struct WebshotMcpServer {
    /// Used by the #[tool_handler] macro
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
    orchestrator: Arc<CaptureOrchestrator>,
}

#[tool_router]
impl WebshotMcpServer {
    /// Creates a server that dispatches to `orchestrator`
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use webshot_core::{CaptureConfig, CaptureOrchestrator};
    /// use webshot_mcp_server::mcp::WebshotMcpServer;
    ///
    /// let orchestrator = Arc::new(CaptureOrchestrator::chromium(CaptureConfig::default()));
    /// let server = WebshotMcpServer::new(orchestrator);
    /// ```
    pub fn new(orchestrator: Arc<CaptureOrchestrator>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            orchestrator,
        }
    }

    /// Creates a server over a mock browser, for tests and development
    pub fn new_with_mock() -> Self {
        let config = CaptureConfig::default().with_stability_delay_ms(0);
        let launcher = Arc::new(MockLauncher::new(MockPageConfig::default()));
        Self::new(Arc::new(CaptureOrchestrator::new(config, launcher)))
    }

    /// The orchestrator behind this server
    pub fn orchestrator(&self) -> &Arc<CaptureOrchestrator> {
        &self.orchestrator
    }

    /// Full-page capture
    ///
    /// Example request arguments:
    ///
    /// ```json
    /// {
    ///   "url": "https://example.com",
    ///   "viewport": { "preset": "mobile" },
    ///   "waitFor": { "type": "selector", "value": "#content" },
    ///   "waitUntil": "networkidle2"
    /// }
    /// ```
    #[tool(
        name = "take_screenshot",
        description = "Take a full-page screenshot of a web page. Supports device presets or a \
                       custom viewport, a wait condition (selector, function, timeout, \
                       networkidle), an extra delay and the navigation completion condition."
    )]
    pub async fn take_screenshot(
        &self,
        Parameters(request): Parameters<CaptureRequest>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = "take_screenshot", url = %request.url, "start");
        let result = self.orchestrator.capture_full_page(&request).await;
        Ok(respond("take_screenshot", result))
    }

    /// Element capture
    #[tool(
        name = "take_element_screenshot",
        description = "Take a screenshot of the first element matching a CSS selector. The page \
                       is loaded with networkidle2 before the element is located."
    )]
    pub async fn take_element_screenshot(
        &self,
        Parameters(params): Parameters<TakeElementScreenshotParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = "take_element_screenshot", url = %params.url, "start");
        let result = self
            .orchestrator
            .capture_element(&params.url, params.selector.as_deref(), &params.options())
            .await;
        Ok(respond("take_element_screenshot", result))
    }

    /// Lists the built-in device presets
    #[tool(
        name = "list_device_presets",
        description = "List the available device presets (mobile, tablet, desktop) with their \
                       viewport sizes, scale factors and user agents."
    )]
    pub async fn list_device_presets(&self) -> Result<CallToolResult, McpError> {
        Ok(build_presets_result())
    }
}

fn respond(tool: &str, result: CaptureResult<CaptureOutput>) -> CallToolResult {
    match result {
        Ok(output) => {
            let (width, height) = output.dimensions();
            info!(tool, width, height, "ok");
            build_capture_result(&output)
        }
        Err(error) => {
            warn!(tool, code = error.code(), error = %error, "failed");
            build_error_result(&error)
        }
    }
}

impl Default for WebshotMcpServer {
    fn default() -> Self {
        Self::new_with_mock()
    }
}

#[tool_handler]
impl ServerHandler for WebshotMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }
}
