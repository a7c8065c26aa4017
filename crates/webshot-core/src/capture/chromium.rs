//! Chromium engine over the Chrome DevTools Protocol
//!
//! Uses chromiumoxide to launch a single Chrome/Chromium process and drive
//! request-scoped tabs. Each tab gets a network observer task that feeds a
//! [`NetworkActivity`] from `Network.*` events, which backs both the
//! `networkidle0/2` navigation conditions and `networkidle` waits.
//!
//! # Requirements
//!
//! A Chrome or Chromium binary must be installed. It is auto-detected unless
//! `WEBSHOT_CHROME_PATH` (or [`CaptureConfig::chrome_executable`]) names one.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chromiumoxide::{
    Page,
    browser::{Browser, BrowserConfig},
    cdp::browser_protocol::{
        emulation::{
            SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams,
            SetUserAgentOverrideParams,
        },
        network::{
            EnableParams as NetworkEnableParams, EventLoadingFailed, EventLoadingFinished,
            EventRequestWillBeSent, EventResponseReceived,
        },
        page::{CaptureScreenshotFormat, GetLayoutMetricsParams, NavigateParams, Viewport},
    },
    page::ScreenshotParams,
};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::{sync::Mutex as AsyncMutex, task::JoinHandle};
use tracing::{debug, info, warn};

use super::{
    constants::{BROWSER_LAUNCH_ARGS, NAVIGATION_IDLE_MS},
    network::NetworkActivity,
    traits::{BrowserLauncher, BrowserSession, PageHandle},
    wait::{poll_until, wait_for_network_idle},
};
use crate::{
    config::CaptureConfig,
    error::{CaptureError, CaptureResult},
    model::{ViewportConfig, WaitUntil},
};

/// Launches Chrome/Chromium via chromiumoxide
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, config: &CaptureConfig) -> CaptureResult<Arc<dyn BrowserSession>> {
        let mut builder =
            BrowserConfig::builder().request_timeout(Duration::from_millis(config.timeout_ms));

        for arg in BROWSER_LAUNCH_ARGS {
            builder = builder.arg(*arg);
        }
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| CaptureError::browser("launch", e))?;

        info!(
            headless = config.headless,
            executable = ?config.chrome_executable,
            "Launching browser"
        );

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CaptureError::browser("launch", e))?;

        // Drives the CDP websocket; every command and event flows through it.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("CDP handler event loop ended");
                    break;
                }
            }
        });

        info!("Browser launched");

        Ok(Arc::new(ChromiumBrowser {
            browser: AsyncMutex::new(browser),
            handler_task: Mutex::new(Some(handler_task)),
        }))
    }
}

/// A running Chrome/Chromium process
pub struct ChromiumBrowser {
    browser: AsyncMutex<Browser>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl BrowserSession for ChromiumBrowser {
    async fn new_page(&self) -> CaptureResult<Box<dyn PageHandle>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::browser("open page", e))?;

        let activity = NetworkActivity::new();
        let observer = spawn_network_observer(&page, activity.clone()).await?;

        Ok(Box::new(ChromiumPage {
            page,
            activity,
            observer: Mutex::new(Some(observer)),
            viewport: Mutex::new(ViewportConfig::default()),
        }))
    }

    async fn close(&self) -> CaptureResult<()> {
        let mut browser = self.browser.lock().await;
        let closed = browser
            .close()
            .await
            .map_err(|e| CaptureError::browser("close", e));
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        if let Some(task) = self.handler_task.lock().take() {
            task.abort();
        }
        closed.map(|_| ())
    }
}

async fn spawn_network_observer(
    page: &Page,
    activity: NetworkActivity,
) -> CaptureResult<JoinHandle<()>> {
    let observe_err = |e: chromiumoxide::error::CdpError| CaptureError::browser("observe network", e);

    page.execute(NetworkEnableParams::default())
        .await
        .map_err(observe_err)?;
    let mut requests = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(observe_err)?;
    let mut responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(observe_err)?;
    let mut finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(observe_err)?;
    let mut failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(observe_err)?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = requests.next() => {
                    // A redirect reuses the request id of a request already counted
                    if event.redirect_response.is_some() {
                        activity.touch();
                    } else {
                        activity.request_started();
                    }
                }
                Some(_) = responses.next() => activity.response_received(),
                Some(_) = finished.next() => activity.request_finished(),
                Some(_) = failed.next() => activity.request_finished(),
                else => break,
            }
        }
    }))
}

/// One Chrome tab
struct ChromiumPage {
    page: Page,
    activity: NetworkActivity,
    observer: Mutex<Option<JoinHandle<()>>>,
    /// Last emulation applied, restored after a full-page capture
    viewport: Mutex<ViewportConfig>,
}

impl ChromiumPage {
    async fn apply_metrics(&self, viewport: &ViewportConfig, height: u32) -> CaptureResult<()> {
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(viewport.width))
            .height(i64::from(height))
            .device_scale_factor(viewport.device_scale_factor)
            .mobile(viewport.is_mobile)
            .build()
            .map_err(|e| CaptureError::browser("set viewport", e))?;

        self.page
            .execute(metrics)
            .await
            .map_err(|e| CaptureError::browser("set viewport", e))?;
        Ok(())
    }

    /// Grows the emulated viewport to the content height, keeping the scale
    /// factor and mobile flag, and captures it in one clip.
    async fn capture_content(&self, viewport: &ViewportConfig) -> CaptureResult<Vec<u8>> {
        let metrics = self
            .page
            .execute(GetLayoutMetricsParams::default())
            .await
            .map_err(|e| CaptureError::browser("read layout metrics", e))?;
        let content = &metrics.result.css_content_size;
        let width = content.width.ceil().max(f64::from(viewport.width));
        let height = content.height.ceil().max(f64::from(viewport.height));

        self.apply_metrics(viewport, height as u32).await?;

        // Clip coordinates are CSS pixels; the device scale factor is applied on top
        let clip = Viewport {
            x: 0.0,
            y: 0.0,
            width,
            height,
            scale: 1.0,
        };
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .clip(clip)
                    .capture_beyond_viewport(true)
                    .build(),
            )
            .await
            .map_err(|e| CaptureError::browser("screenshot", e))
    }

    async fn goto_and_wait_for_load(&self, url: &str) -> CaptureResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| CaptureError::browser("navigate", e))?;
        Ok(())
    }

    async fn goto_and_wait_for_dom(&self, url: &str, timeout: Duration) -> CaptureResult<()> {
        let response = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| CaptureError::browser("navigate", e))?;
        if let Some(error_text) = &response.result.error_text {
            return Err(CaptureError::browser("navigate", error_text));
        }

        let page = &self.page;
        poll_until("DOMContentLoaded", timeout, move || async move {
            let state = page
                .evaluate("document.readyState")
                .await
                .map_err(|e| CaptureError::browser("evaluate", e))?
                .into_value::<String>()
                .map_err(|e| CaptureError::browser("evaluate", e))?;
            Ok::<bool, CaptureError>(state != "loading")
        })
        .await
    }
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn set_viewport(&self, viewport: &ViewportConfig) -> CaptureResult<()> {
        self.apply_metrics(viewport, viewport.height).await?;
        *self.viewport.lock() = viewport.clone();
        self.page
            .execute(SetTouchEmulationEnabledParams::new(viewport.has_touch))
            .await
            .map_err(|e| CaptureError::browser("set viewport", e))?;
        Ok(())
    }

    async fn set_user_agent(&self, user_agent: &str) -> CaptureResult<()> {
        self.page
            .execute(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map_err(|e| CaptureError::browser("set user agent", e))?;
        Ok(())
    }

    async fn navigate(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> CaptureResult<()> {
        let navigation = async {
            match wait_until {
                WaitUntil::DomContentLoaded => self.goto_and_wait_for_dom(url, timeout).await,
                WaitUntil::Load => self.goto_and_wait_for_load(url).await,
                WaitUntil::NetworkIdle0 | WaitUntil::NetworkIdle2 => {
                    self.goto_and_wait_for_load(url).await?;
                    wait_for_network_idle(
                        &self.activity,
                        Duration::from_millis(NAVIGATION_IDLE_MS),
                        timeout,
                        wait_until.max_inflight(),
                    )
                    .await
                }
            }
        };

        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| CaptureError::Timeout {
                operation: format!("navigation to {} ({})", url, wait_until),
                duration_ms: timeout.as_millis() as u64,
            })?
    }

    async fn element_exists(&self, selector: &str) -> CaptureResult<bool> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| CaptureError::browser("query selector", e))?;
        Ok(!elements.is_empty())
    }

    async fn evaluate_predicate(&self, expression: &str) -> CaptureResult<bool> {
        // Accepts both an expression and a function source
        let script = format!(
            "(() => {{ const p = ({}); return Boolean(typeof p === 'function' ? p() : p); }})()",
            expression
        );
        self.page
            .evaluate(script)
            .await
            .map_err(|e| CaptureError::browser("evaluate", e))?
            .into_value::<bool>()
            .map_err(|e| CaptureError::browser("evaluate", e))
    }

    fn network_activity(&self) -> NetworkActivity {
        self.activity.clone()
    }

    async fn title(&self) -> CaptureResult<Option<String>> {
        self.page
            .get_title()
            .await
            .map_err(|e| CaptureError::browser("read title", e))
    }

    async fn screenshot_full_page(&self) -> CaptureResult<Vec<u8>> {
        let viewport = self.viewport.lock().clone();
        let captured = self.capture_content(&viewport).await;

        // Put back the requested viewport rather than clearing the override
        let restored = self.apply_metrics(&viewport, viewport.height).await;
        let png = captured?;
        if let Err(e) = restored {
            warn!(error = %e, "Failed to restore viewport after full-page capture");
        }
        Ok(png)
    }

    async fn screenshot_element(&self, selector: &str) -> CaptureResult<Option<Vec<u8>>> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| CaptureError::browser("query selector", e))?;
        let Some(element) = elements.into_iter().next() else {
            return Ok(None);
        };

        element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map(Some)
            .map_err(|e| CaptureError::browser("screenshot element", e))
    }

    async fn close(&self) -> CaptureResult<()> {
        if let Some(observer) = self.observer.lock().take() {
            observer.abort();
        }
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| CaptureError::browser("close page", e))
    }
}
