//! Capability traits for browser engines
//!
//! The orchestrator drives a page through these traits only, so the engine
//! behind them can be swapped (Chromium over CDP in production, a mock in
//! tests).
//!
//! # Trait Hierarchy
//!
//! - [`BrowserLauncher`]: Starts a browser process
//! - [`BrowserSession`]: A running browser that hands out pages
//! - [`PageHandle`]: One request-scoped tab

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use super::network::NetworkActivity;
use crate::{config::CaptureConfig, error::CaptureResult, model::{ViewportConfig, WaitUntil}};

/// Capability: start a browser process.
///
/// Called lazily, at most once per orchestrator session, on the first
/// capture that needs a browser.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launches a browser configured by `config` (headless mode, executable
    /// path, request timeout).
    async fn launch(&self, config: &CaptureConfig) -> CaptureResult<Arc<dyn BrowserSession>>;
}

/// Capability: a running browser shared by all captures.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Opens a blank page owned exclusively by the caller
    async fn new_page(&self) -> CaptureResult<Box<dyn PageHandle>>;

    /// Terminates the browser process and releases its resources
    async fn close(&self) -> CaptureResult<()>;
}

/// Capability: one browser tab, scoped to a single capture.
///
/// The caller must call [`PageHandle::close`] on every exit path.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Applies viewport size, scale factor and mobile/touch emulation.
    ///
    /// The user agent is applied separately via
    /// [`PageHandle::set_user_agent`].
    async fn set_viewport(&self, viewport: &ViewportConfig) -> CaptureResult<()>;

    /// Overrides the user agent for subsequent requests
    async fn set_user_agent(&self, user_agent: &str) -> CaptureResult<()>;

    /// Navigates to `url` and blocks until `wait_until` is satisfied.
    ///
    /// Fails with `Timeout` once `timeout` elapses.
    async fn navigate(&self, url: &str, wait_until: WaitUntil, timeout: Duration)
    -> CaptureResult<()>;

    /// Whether at least one element matches `selector`
    async fn element_exists(&self, selector: &str) -> CaptureResult<bool>;

    /// Evaluates `expression` in the page and reports whether it is truthy
    async fn evaluate_predicate(&self, expression: &str) -> CaptureResult<bool>;

    /// Network tracker fed by this page's request/response events
    fn network_activity(&self) -> NetworkActivity;

    /// Document title, if the page has one
    async fn title(&self) -> CaptureResult<Option<String>>;

    /// PNG screenshot of the whole scrollable document
    async fn screenshot_full_page(&self) -> CaptureResult<Vec<u8>>;

    /// PNG screenshot of the first element matching `selector`.
    ///
    /// Returns `Ok(None)` when nothing matches.
    async fn screenshot_element(&self, selector: &str) -> CaptureResult<Option<Vec<u8>>>;

    /// Closes the tab
    async fn close(&self) -> CaptureResult<()>;
}
