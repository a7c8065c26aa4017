//! Mock browser engine for testing
//!
//! This module provides [`MockLauncher`], [`MockBrowser`] and the page they
//! hand out, implementing the engine traits without a real browser. Pages
//! render synthetic gradient PNGs sized from the applied viewport.
//!
//! # Features
//!
//! - **Synthetic Screenshots:** PNG test patterns at the emulated resolution
//! - **Configurable DOM:** elements (optionally appearing after a delay),
//!   truthy predicates, and a document title
//! - **Timing:** navigation and launch delays, periodic fake network activity
//! - **Error Injection:** launch, navigation and screenshot failures, or
//!   corrupt screenshot bytes
//! - **Counters:** launches, browser closes, pages opened and closed, and a
//!   log of applied viewports, user agents and navigations
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use webshot_core::{
//!     capture::mock::{MockLauncher, MockPageConfig},
//!     config::CaptureConfig,
//!     model::CaptureRequest,
//!     orchestrator::CaptureOrchestrator,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let launcher = MockLauncher::new(MockPageConfig::default().with_title("Example"));
//!     let stats = launcher.stats();
//!     let config = CaptureConfig::default().with_stability_delay_ms(0);
//!     let orchestrator = CaptureOrchestrator::new(config, Arc::new(launcher));
//!
//!     let request = CaptureRequest::new("https://example.com")
//!         .with_viewport(webshot_core::model::ViewportParams::sized(320, 240));
//!     let output = orchestrator.capture_full_page(&request).await.unwrap();
//!
//!     assert_eq!(output.dimensions(), (320, 240));
//!     assert_eq!(output.metadata.title.as_deref(), Some("Example"));
//!     assert_eq!(stats.open_pages(), 0);
//!
//!     orchestrator.shutdown().await.unwrap();
//! }
//! ```

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{Instant, sleep},
};

use super::{
    image_buffer::ImageBuffer,
    network::NetworkActivity,
    traits::{BrowserLauncher, BrowserSession, PageHandle},
};
use crate::{
    config::CaptureConfig,
    error::{CaptureError, CaptureResult},
    model::{ViewportConfig, WaitUntil},
};

/// Behavior of every page a mock browser opens
#[derive(Debug, Clone, Default)]
pub struct MockPageConfig {
    /// Document title; `None` reports an untitled page
    pub title: Option<String>,
    /// Selector to element size in CSS pixels
    pub elements: HashMap<String, (u32, u32)>,
    /// Selectors that only match after the given time since navigation
    pub delayed_elements: HashMap<String, Duration>,
    /// Predicate expressions that evaluate truthy
    pub truthy_predicates: HashSet<String>,
    /// Document height in CSS pixels; `None` means one viewport tall
    pub content_height: Option<u32>,
    /// Fixed screenshot size, overriding the viewport-derived size
    pub screenshot_size: Option<(u32, u32)>,
    /// Simulated navigation time
    pub navigation_delay: Duration,
    /// Navigation fails with this reason
    pub navigation_error: Option<String>,
    /// Screenshots fail with this reason
    pub screenshot_error: Option<String>,
    /// Screenshots return bytes that are not a PNG
    pub corrupt_screenshot: bool,
    /// Emit a fake network event at this interval after navigation
    pub network_chatter: Option<Duration>,
}

impl MockPageConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_element(mut self, selector: impl Into<String>, width: u32, height: u32) -> Self {
        self.elements.insert(selector.into(), (width, height));
        self
    }

    /// Adds a 100x50 element that matches only `after` navigation
    pub fn with_delayed_element(mut self, selector: impl Into<String>, after: Duration) -> Self {
        let selector = selector.into();
        self.elements.insert(selector.clone(), (100, 50));
        self.delayed_elements.insert(selector, after);
        self
    }

    pub fn with_truthy_predicate(mut self, expression: impl Into<String>) -> Self {
        self.truthy_predicates.insert(expression.into());
        self
    }

    pub fn with_content_height(mut self, height: u32) -> Self {
        self.content_height = Some(height);
        self
    }

    pub fn with_screenshot_size(mut self, width: u32, height: u32) -> Self {
        self.screenshot_size = Some((width, height));
        self
    }

    pub fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = delay;
        self
    }

    pub fn with_navigation_error(mut self, reason: impl Into<String>) -> Self {
        self.navigation_error = Some(reason.into());
        self
    }

    pub fn with_screenshot_error(mut self, reason: impl Into<String>) -> Self {
        self.screenshot_error = Some(reason.into());
        self
    }

    pub fn with_corrupt_screenshot(mut self) -> Self {
        self.corrupt_screenshot = true;
        self
    }

    pub fn with_network_chatter(mut self, every: Duration) -> Self {
        self.network_chatter = Some(every);
        self
    }
}

/// Counters and call log shared by a launcher, its browsers and their pages
#[derive(Debug, Default)]
pub struct MockStats {
    launches: AtomicUsize,
    browser_closes: AtomicUsize,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
    viewports: Mutex<Vec<ViewportConfig>>,
    user_agents: Mutex<Vec<String>>,
    navigations: Mutex<Vec<(String, WaitUntil)>>,
}

impl MockStats {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn browser_closes(&self) -> usize {
        self.browser_closes.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    /// Pages opened but not yet closed
    pub fn open_pages(&self) -> usize {
        self.pages_opened().saturating_sub(self.pages_closed())
    }

    /// Viewports applied, in call order
    pub fn viewports(&self) -> Vec<ViewportConfig> {
        self.viewports.lock().clone()
    }

    /// User agents applied, in call order
    pub fn user_agents(&self) -> Vec<String> {
        self.user_agents.lock().clone()
    }

    /// Navigations performed, in call order
    pub fn navigations(&self) -> Vec<(String, WaitUntil)> {
        self.navigations.lock().clone()
    }
}

/// Mock [`BrowserLauncher`]
#[derive(Debug)]
pub struct MockLauncher {
    page_config: MockPageConfig,
    launch_delay: Duration,
    launch_error: Option<String>,
    stats: Arc<MockStats>,
}

impl MockLauncher {
    pub fn new(page_config: MockPageConfig) -> Self {
        Self {
            page_config,
            launch_delay: Duration::ZERO,
            launch_error: None,
            stats: Arc::new(MockStats::default()),
        }
    }

    /// Simulates a slow browser start
    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    /// Makes every launch fail with `reason`
    pub fn with_launch_error(mut self, reason: impl Into<String>) -> Self {
        self.launch_error = Some(reason.into());
        self
    }

    /// Shared counters for everything this launcher creates
    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for MockLauncher {
    fn default() -> Self {
        Self::new(MockPageConfig::default())
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self, _config: &CaptureConfig) -> CaptureResult<Arc<dyn BrowserSession>> {
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        if !self.launch_delay.is_zero() {
            sleep(self.launch_delay).await;
        }
        if let Some(reason) = &self.launch_error {
            return Err(CaptureError::browser("launch", reason));
        }
        Ok(Arc::new(MockBrowser {
            page_config: self.page_config.clone(),
            stats: Arc::clone(&self.stats),
        }))
    }
}

/// Mock [`BrowserSession`]
#[derive(Debug)]
pub struct MockBrowser {
    page_config: MockPageConfig,
    stats: Arc<MockStats>,
}

impl MockBrowser {
    /// Creates a standalone browser with its own counters
    pub fn new(page_config: MockPageConfig) -> Self {
        Self {
            page_config,
            stats: Arc::new(MockStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    /// Opens a page synchronously
    pub fn open_page(&self) -> Box<dyn PageHandle> {
        self.stats.pages_opened.fetch_add(1, Ordering::SeqCst);
        Box::new(MockPage {
            config: self.page_config.clone(),
            stats: Arc::clone(&self.stats),
            activity: NetworkActivity::new(),
            viewport: Mutex::new(ViewportConfig::default()),
            navigated_at: Mutex::new(Instant::now()),
            chatter: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl BrowserSession for MockBrowser {
    async fn new_page(&self) -> CaptureResult<Box<dyn PageHandle>> {
        Ok(self.open_page())
    }

    async fn close(&self) -> CaptureResult<()> {
        self.stats.browser_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockPage {
    config: MockPageConfig,
    stats: Arc<MockStats>,
    activity: NetworkActivity,
    viewport: Mutex<ViewportConfig>,
    navigated_at: Mutex<Instant>,
    chatter: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl MockPage {
    fn matches(&self, selector: &str) -> bool {
        if !self.config.elements.contains_key(selector) {
            return false;
        }
        match self.config.delayed_elements.get(selector) {
            Some(after) => self.navigated_at.lock().elapsed() >= *after,
            None => true,
        }
    }

    fn render(&self, css_width: u32, css_height: u32) -> CaptureResult<Vec<u8>> {
        if let Some(reason) = &self.config.screenshot_error {
            return Err(CaptureError::browser("screenshot", reason));
        }
        if self.config.corrupt_screenshot {
            return Ok(b"not a png".to_vec());
        }

        let scale = self.viewport.lock().device_scale_factor;
        let width = ((f64::from(css_width) * scale).round() as u32).max(1);
        let height = ((f64::from(css_height) * scale).round() as u32).max(1);
        ImageBuffer::from_test_pattern(width, height).to_png()
    }

    fn stop_chatter(&self) {
        if let Some(handle) = self.chatter.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for MockPage {
    fn drop(&mut self) {
        self.stop_chatter();
    }
}

#[async_trait]
impl PageHandle for MockPage {
    async fn set_viewport(&self, viewport: &ViewportConfig) -> CaptureResult<()> {
        *self.viewport.lock() = viewport.clone();
        self.stats.viewports.lock().push(viewport.clone());
        Ok(())
    }

    async fn set_user_agent(&self, user_agent: &str) -> CaptureResult<()> {
        self.stats.user_agents.lock().push(user_agent.to_string());
        Ok(())
    }

    async fn navigate(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> CaptureResult<()> {
        self.stats
            .navigations
            .lock()
            .push((url.to_string(), wait_until));
        self.activity.request_started();

        if tokio::time::timeout(timeout, sleep(self.config.navigation_delay))
            .await
            .is_err()
        {
            return Err(CaptureError::Timeout {
                operation: format!("navigation to {}", url),
                duration_ms: timeout.as_millis() as u64,
            });
        }
        self.activity.request_finished();

        if let Some(reason) = &self.config.navigation_error {
            return Err(CaptureError::browser("navigate", reason));
        }

        *self.navigated_at.lock() = Instant::now();

        if let Some(every) = self.config.network_chatter {
            let activity = self.activity.clone();
            let handle = tokio::spawn(async move {
                loop {
                    activity.request_started();
                    activity.request_finished();
                    sleep(every).await;
                }
            });
            if let Some(previous) = self.chatter.lock().replace(handle) {
                previous.abort();
            }
        }

        Ok(())
    }

    async fn element_exists(&self, selector: &str) -> CaptureResult<bool> {
        Ok(self.matches(selector))
    }

    async fn evaluate_predicate(&self, expression: &str) -> CaptureResult<bool> {
        Ok(self.config.truthy_predicates.contains(expression))
    }

    fn network_activity(&self) -> NetworkActivity {
        self.activity.clone()
    }

    async fn title(&self) -> CaptureResult<Option<String>> {
        Ok(self.config.title.clone())
    }

    async fn screenshot_full_page(&self) -> CaptureResult<Vec<u8>> {
        if let Some((width, height)) = self.config.screenshot_size {
            if self.config.screenshot_error.is_none() && !self.config.corrupt_screenshot {
                return ImageBuffer::from_test_pattern(width, height).to_png();
            }
        }

        let (width, height) = {
            let viewport = self.viewport.lock();
            let height = self
                .config
                .content_height
                .map_or(viewport.height, |content| content.max(viewport.height));
            (viewport.width, height)
        };
        self.render(width, height)
    }

    async fn screenshot_element(&self, selector: &str) -> CaptureResult<Option<Vec<u8>>> {
        if !self.matches(selector) {
            return Ok(None);
        }
        let Some(&(width, height)) = self.config.elements.get(selector) else {
            return Ok(None);
        };
        self.render(width, height).map(Some)
    }

    async fn close(&self) -> CaptureResult<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.stop_chatter();
            self.stats.pages_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
