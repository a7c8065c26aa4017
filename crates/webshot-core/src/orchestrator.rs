//! Capture orchestrator
//!
//! Owns the shared browser session and the admission gate, and runs the
//! step sequence for full-page and element captures:
//!
//! 1. Admission (full-page only)
//! 2. Validation of URL, selector, viewport and wait condition
//! 3. Lazy browser launch and a fresh page per request
//! 4. Viewport and user-agent emulation
//! 5. Navigation, optional wait condition, stability delay, extra delay
//! 6. Screenshot, resize normalization, metadata
//!
//! The page is closed on every exit path. Full-page failures after
//! admission are wrapped in [`CaptureError::CaptureFailed`]; element
//! capture returns its errors unwrapped.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use chrono::{SecondsFormat, Utc};
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, info, instrument, warn};

use crate::{
    capture::{
        BrowserLauncher, BrowserSession, ChromiumLauncher, PageHandle, image_buffer::normalize_png,
        wait::execute_wait,
    },
    config::CaptureConfig,
    error::{CaptureError, CaptureResult},
    model::{
        CaptureMetadata, CaptureOutput, CaptureRequest, ElementCaptureOptions, ViewportConfig,
        ViewportParams, WaitCondition, WaitFor, WaitUntil,
    },
    validation::{require_selector, validate_url, validate_viewport_config},
};

/// Hard ceiling on concurrent full-page captures; rejects instead of queueing
#[derive(Debug)]
struct AdmissionGate {
    active: AtomicUsize,
    max: usize,
}

/// Releases one admission slot when dropped
struct AdmissionPermit<'a> {
    gate: &'a AdmissionGate,
}

impl AdmissionGate {
    fn new(max: usize) -> Self {
        Self {
            active: AtomicUsize::new(0),
            max,
        }
    }

    /// Check and increment as one atomic step
    fn try_acquire(&self) -> Option<AdmissionPermit<'_>> {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| {
                (active < self.max).then_some(active + 1)
            })
            .ok()
            .map(|_| AdmissionPermit { gate: self })
    }

    fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.gate.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Coordinates captures against one lazily started browser
pub struct CaptureOrchestrator {
    config: CaptureConfig,
    launcher: Arc<dyn BrowserLauncher>,
    session: Mutex<Option<Arc<dyn BrowserSession>>>,
    gate: AdmissionGate,
}

impl CaptureOrchestrator {
    /// Creates an orchestrator; no browser is started until first use
    pub fn new(config: CaptureConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        let gate = AdmissionGate::new(config.max_concurrent);
        Self {
            config,
            launcher,
            session: Mutex::new(None),
            gate,
        }
    }

    /// Creates an orchestrator backed by Chrome/Chromium
    pub fn chromium(config: CaptureConfig) -> Self {
        Self::new(config, Arc::new(ChromiumLauncher))
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Starts the browser if it is not running yet.
    ///
    /// Concurrent callers wait on the same launch; at most one browser is
    /// ever started per session.
    pub async fn initialize(&self) -> CaptureResult<()> {
        self.session().await.map(|_| ())
    }

    /// Closes the browser, if any. Safe to call repeatedly or before
    /// [`initialize`](Self::initialize).
    pub async fn shutdown(&self) -> CaptureResult<()> {
        let Some(session) = self.session.lock().await.take() else {
            debug!("Shutdown requested with no browser running");
            return Ok(());
        };

        info!("Shutting down browser");
        session.close().await?;
        info!("Browser shut down");
        Ok(())
    }

    /// Whether a browser session is running
    pub async fn is_initialized(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Full-page captures currently admitted
    pub fn active_count(&self) -> usize {
        self.gate.active()
    }

    /// Admission ceiling for full-page captures
    pub fn max_concurrent(&self) -> usize {
        self.gate.max
    }

    async fn session(&self) -> CaptureResult<Arc<dyn BrowserSession>> {
        let mut slot = self.session.lock().await;
        if let Some(session) = slot.as_ref() {
            return Ok(Arc::clone(session));
        }

        let session = self.launcher.launch(&self.config).await?;
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Captures the whole scrollable page at `request.url`.
    ///
    /// # Errors
    ///
    /// - `RateLimitExceeded` when `max_concurrent` captures are already
    ///   running; nothing else is attempted.
    /// - `CaptureFailed` wrapping the cause for anything that fails after
    ///   admission, validation included.
    #[instrument(skip_all, fields(url = %request.url))]
    pub async fn capture_full_page(&self, request: &CaptureRequest) -> CaptureResult<CaptureOutput> {
        let Some(_permit) = self.gate.try_acquire() else {
            warn!(
                max_concurrent = self.gate.max,
                "Rejecting capture: concurrency limit reached"
            );
            return Err(CaptureError::RateLimitExceeded {
                max_concurrent: self.gate.max,
            });
        };
        debug!(active = self.gate.active(), "Capture admitted");

        self.run_full_page(request)
            .await
            .map_err(|e| CaptureError::capture_failed(&request.url, e))
    }

    async fn run_full_page(&self, request: &CaptureRequest) -> CaptureResult<CaptureOutput> {
        let url = validate_url(&request.url)?;
        let viewport = resolve_viewport(request.viewport.as_ref())?;
        let wait = request.wait_for.as_ref().map(WaitFor::resolve).transpose()?;

        let page = self.session().await?.new_page().await?;
        let result = self
            .drive_full_page(page.as_ref(), &url, &viewport, wait.as_ref(), request)
            .await;
        close_page(page.as_ref()).await;
        result
    }

    async fn drive_full_page(
        &self,
        page: &dyn PageHandle,
        url: &str,
        viewport: &ViewportConfig,
        wait: Option<&WaitCondition>,
        request: &CaptureRequest,
    ) -> CaptureResult<CaptureOutput> {
        apply_viewport(page, viewport).await?;
        self.navigate(page, url, request.wait_until).await?;

        if let Some(condition) = wait {
            execute_wait(page, condition).await?;
        }
        self.settle(request.standard_delay, request.delay).await;

        let bytes = page.screenshot_full_page().await?;
        let normalized = normalize_png(&bytes, self.config.max_image_dimension)?;
        let title = page.title().await?;

        debug!(
            width = normalized.width,
            height = normalized.height,
            resized = normalized.resized,
            "Full-page capture complete"
        );

        Ok(CaptureOutput {
            success: true,
            metadata: CaptureMetadata {
                url: url.to_string(),
                timestamp: timestamp(),
                viewport: Some(viewport.clone()),
                title,
                image_width: normalized.width,
                image_height: normalized.height,
                selector: None,
            },
            data: normalized.data,
        })
    }

    /// Captures the first element matching `selector` on the page at `url`.
    ///
    /// Element captures are not subject to the admission gate. Navigation
    /// always waits for `networkidle2`.
    ///
    /// # Errors
    ///
    /// - `InvalidSelector` when `selector` is absent or blank
    /// - `UnsafeSelector` when it matches the denylist
    /// - `ElementNotFound` when nothing on the page matches
    #[instrument(skip_all, fields(url = %url))]
    pub async fn capture_element(
        &self,
        url: &str,
        selector: Option<&str>,
        options: &ElementCaptureOptions,
    ) -> CaptureResult<CaptureOutput> {
        let url = validate_url(url)?;
        let selector = require_selector(selector)?;
        let viewport = resolve_viewport(options.viewport.as_ref())?;

        let page = self.session().await?.new_page().await?;
        let result = self
            .drive_element(page.as_ref(), &url, &selector, &viewport, options)
            .await;
        close_page(page.as_ref()).await;
        result
    }

    async fn drive_element(
        &self,
        page: &dyn PageHandle,
        url: &str,
        selector: &str,
        viewport: &ViewportConfig,
        options: &ElementCaptureOptions,
    ) -> CaptureResult<CaptureOutput> {
        apply_viewport(page, viewport).await?;
        self.navigate(page, url, WaitUntil::NetworkIdle2).await?;
        self.settle(options.standard_delay, options.delay).await;

        let bytes = page
            .screenshot_element(selector)
            .await?
            .ok_or_else(|| CaptureError::ElementNotFound {
                selector: selector.to_string(),
            })?;
        let normalized = normalize_png(&bytes, self.config.max_image_dimension)?;

        debug!(
            %selector,
            width = normalized.width,
            height = normalized.height,
            "Element capture complete"
        );

        Ok(CaptureOutput {
            success: true,
            metadata: CaptureMetadata {
                url: url.to_string(),
                timestamp: timestamp(),
                viewport: None,
                title: None,
                image_width: normalized.width,
                image_height: normalized.height,
                selector: Some(selector.to_string()),
            },
            data: normalized.data,
        })
    }

    async fn navigate(&self, page: &dyn PageHandle, url: &str, wait_until: WaitUntil) -> CaptureResult<()> {
        debug!(%wait_until, timeout_ms = self.config.timeout_ms, "Navigating");
        page.navigate(url, wait_until, Duration::from_millis(self.config.timeout_ms))
            .await
    }

    /// Stability delay (unless disabled), then the caller's extra delay
    async fn settle(&self, standard_delay: bool, delay: Option<u64>) {
        if standard_delay && self.config.stability_delay_ms > 0 {
            debug!(delay_ms = self.config.stability_delay_ms, "Stability delay");
            sleep(Duration::from_millis(self.config.stability_delay_ms)).await;
        }
        if let Some(delay_ms) = delay.filter(|ms| *ms > 0) {
            debug!(delay_ms, "Extra delay");
            sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}

fn resolve_viewport(params: Option<&ViewportParams>) -> CaptureResult<ViewportConfig> {
    let viewport = params.map(ViewportParams::resolve).unwrap_or_default();
    validate_viewport_config(&viewport)?;
    Ok(viewport)
}

async fn apply_viewport(page: &dyn PageHandle, viewport: &ViewportConfig) -> CaptureResult<()> {
    debug!(
        width = viewport.width,
        height = viewport.height,
        scale = viewport.device_scale_factor,
        mobile = viewport.is_mobile,
        "Applying viewport"
    );
    page.set_viewport(viewport).await?;
    if let Some(user_agent) = &viewport.user_agent {
        page.set_user_agent(user_agent).await?;
    }
    Ok(())
}

async fn close_page(page: &dyn PageHandle) {
    if let Err(e) = page.close().await {
        warn!(error = %e, "Failed to close page");
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
