//! Orchestrator integration tests against the mock engine
//!
//! These exercise the full capture pipeline (admission, validation, page
//! lifecycle, emulation, waits, delays, normalization, metadata) without a
//! real browser. Timing-sensitive tests run on tokio's paused clock.

use std::{sync::Arc, time::Duration};

use tokio::time::Instant;
use webshot_core::{
    capture::{
        image_buffer::png_dimensions,
        mock::{MockLauncher, MockPageConfig, MockStats},
    },
    config::CaptureConfig,
    error::CaptureError,
    model::{
        CaptureRequest, ElementCaptureOptions, ViewportParams, WaitFor, WaitKind, WaitUntil,
    },
    orchestrator::CaptureOrchestrator,
    presets::IPHONE_USER_AGENT,
};

/// Small viewport so synthetic screenshots stay cheap
fn small() -> ViewportParams {
    ViewportParams::sized(200, 150)
}

fn fast_config() -> CaptureConfig {
    CaptureConfig::default().with_stability_delay_ms(0)
}

/// Paused-clock elapsed time, allowing for timer rounding
fn assert_elapsed(start: Instant, expected_ms: u64) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(expected_ms)
            && elapsed < Duration::from_millis(expected_ms + 50),
        "expected ~{expected_ms}ms, got {elapsed:?}"
    );
}

fn orchestrator(config: CaptureConfig, pages: MockPageConfig) -> (CaptureOrchestrator, Arc<MockStats>) {
    let launcher = MockLauncher::new(pages);
    let stats = launcher.stats();
    (CaptureOrchestrator::new(config, Arc::new(launcher)), stats)
}

#[tokio::test]
async fn test_full_page_capture_metadata() {
    let (orchestrator, stats) =
        orchestrator(fast_config(), MockPageConfig::default().with_title("Example Domain"));
    let request = CaptureRequest::new("https://example.com").with_viewport(small());

    let output = orchestrator.capture_full_page(&request).await.unwrap();

    assert!(output.success);
    assert_eq!(output.dimensions(), (200, 150));
    assert_eq!(png_dimensions(&output.data).unwrap(), (200, 150));
    assert_eq!(output.metadata.url, "https://example.com");
    assert_eq!(output.metadata.title.as_deref(), Some("Example Domain"));
    assert_eq!(output.metadata.viewport.as_ref().map(|v| v.width), Some(200));
    assert!(output.metadata.selector.is_none());
    assert!(chrono::DateTime::parse_from_rfc3339(&output.metadata.timestamp).is_ok());

    assert_eq!(stats.launches(), 1);
    assert_eq!(stats.open_pages(), 0);
    assert_eq!(orchestrator.active_count(), 0);
}

#[tokio::test]
async fn test_browser_is_launched_once_and_reused() {
    let (orchestrator, stats) = orchestrator(fast_config(), MockPageConfig::default());
    let request = CaptureRequest::new("https://example.com").with_viewport(small());

    assert!(!orchestrator.is_initialized().await);
    for _ in 0..3 {
        orchestrator.capture_full_page(&request).await.unwrap();
    }

    assert!(orchestrator.is_initialized().await);
    assert_eq!(stats.launches(), 1);
    assert_eq!(stats.pages_opened(), 3);
    assert_eq!(stats.pages_closed(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_initialize_launches_once() {
    let launcher = MockLauncher::default().with_launch_delay(Duration::from_millis(200));
    let stats = launcher.stats();
    let orchestrator = Arc::new(CaptureOrchestrator::new(fast_config(), Arc::new(launcher)));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.initialize().await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(stats.launches(), 1);
}

#[tokio::test]
async fn test_shutdown_is_idempotent_and_allows_relaunch() {
    let (orchestrator, stats) = orchestrator(fast_config(), MockPageConfig::default());
    orchestrator.initialize().await.unwrap();

    orchestrator.shutdown().await.unwrap();
    orchestrator.shutdown().await.unwrap();
    assert!(!orchestrator.is_initialized().await);
    assert_eq!(stats.browser_closes(), 1);

    orchestrator.initialize().await.unwrap();
    assert_eq!(stats.launches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_rejects_exactly_one() {
    let config = fast_config().with_max_concurrent(3);
    let (orchestrator, stats) = orchestrator(
        config,
        MockPageConfig::default().with_navigation_delay(Duration::from_millis(500)),
    );
    let orchestrator = Arc::new(orchestrator);
    let request = CaptureRequest::new("https://example.com").with_viewport(small());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            let request = request.clone();
            tokio::spawn(async move { orchestrator.capture_full_page(&request).await })
        })
        .collect();

    let mut rejected = 0;
    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(CaptureError::RateLimitExceeded { max_concurrent }) => {
                assert_eq!(max_concurrent, 3);
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 3);
    assert_eq!(rejected, 1);
    assert_eq!(orchestrator.active_count(), 0);
    assert_eq!(stats.open_pages(), 0);
}

#[tokio::test]
async fn test_invalid_url_is_wrapped_and_releases_slot() {
    let (orchestrator, stats) = orchestrator(fast_config().with_max_concurrent(1), MockPageConfig::default());

    let err = orchestrator
        .capture_full_page(&CaptureRequest::new("ftp://example.com"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "CAPTURE_FAILED");
    assert!(matches!(err.inner_kind(), CaptureError::InvalidUrl { .. }));
    assert_eq!(orchestrator.active_count(), 0);
    assert_eq!(stats.launches(), 0);

    // The single slot is free again
    let ok = CaptureRequest::new("https://example.com").with_viewport(small());
    orchestrator.capture_full_page(&ok).await.unwrap();
}

#[tokio::test]
async fn test_invalid_viewport_is_wrapped() {
    let (orchestrator, _) = orchestrator(fast_config(), MockPageConfig::default());
    let request =
        CaptureRequest::new("https://example.com").with_viewport(ViewportParams::sized(99, 6000));

    let err = orchestrator.capture_full_page(&request).await.unwrap_err();

    let CaptureError::CaptureFailed { url, source } = &err else {
        panic!("expected CaptureFailed, got {err:?}");
    };
    assert_eq!(url, "https://example.com");
    let message = source.to_string();
    assert!(message.contains("width 99"));
    assert!(message.contains("height 6000"));
}

#[tokio::test]
async fn test_mobile_preset_emulation() {
    let (orchestrator, stats) = orchestrator(fast_config(), MockPageConfig::default());
    let request =
        CaptureRequest::new("https://example.com").with_viewport(ViewportParams::preset("mobile"));

    let output = orchestrator.capture_full_page(&request).await.unwrap();

    let viewport = output.metadata.viewport.clone().unwrap();
    assert_eq!((viewport.width, viewport.height), (375, 667));
    assert_eq!(viewport.device_scale_factor, 2.0);
    assert!(viewport.is_mobile && viewport.has_touch);
    // Image pixels are CSS pixels times the device scale factor
    let scaled = |css: u32| (f64::from(css) * viewport.device_scale_factor) as u32;
    assert_eq!(output.metadata.image_width, scaled(viewport.width));
    assert_eq!(output.metadata.image_height, scaled(viewport.height));
    assert_eq!(output.dimensions(), (750, 1334));
    assert_eq!(stats.viewports(), vec![viewport]);
    assert_eq!(stats.user_agents(), vec![IPHONE_USER_AGENT.to_string()]);
}

#[tokio::test]
async fn test_no_user_agent_override_without_one() {
    let (orchestrator, stats) = orchestrator(fast_config(), MockPageConfig::default());
    let request = CaptureRequest::new("https://example.com").with_viewport(small());

    orchestrator.capture_full_page(&request).await.unwrap();

    assert!(stats.user_agents().is_empty());
}

#[tokio::test]
async fn test_wait_until_is_forwarded() {
    let (orchestrator, stats) = orchestrator(fast_config(), MockPageConfig::default());
    let request = CaptureRequest::new("https://example.com/page")
        .with_viewport(small())
        .with_wait_until(WaitUntil::DomContentLoaded);

    orchestrator.capture_full_page(&request).await.unwrap();

    assert_eq!(
        stats.navigations(),
        vec![("https://example.com/page".to_string(), WaitUntil::DomContentLoaded)]
    );
}

#[tokio::test]
async fn test_oversized_capture_is_downscaled() {
    let config = fast_config().with_max_image_dimension(300);
    let (orchestrator, _) = orchestrator(
        config,
        MockPageConfig::default().with_content_height(1200),
    );
    let request =
        CaptureRequest::new("https://example.com").with_viewport(ViewportParams::sized(150, 150));

    let output = orchestrator.capture_full_page(&request).await.unwrap();

    // 150x1200 scaled by 300/1200
    assert_eq!(output.dimensions(), (37, 300));
    assert_eq!(png_dimensions(&output.data).unwrap(), (37, 300));
}

#[tokio::test]
async fn test_corrupt_screenshot_is_metadata_error() {
    let (orchestrator, stats) = orchestrator(
        fast_config(),
        MockPageConfig::default().with_corrupt_screenshot(),
    );
    let request = CaptureRequest::new("https://example.com").with_viewport(small());

    let err = orchestrator.capture_full_page(&request).await.unwrap_err();

    assert!(matches!(err.inner_kind(), CaptureError::ImageMetadataError { .. }));
    assert_eq!(stats.open_pages(), 0);
}

#[tokio::test]
async fn test_navigation_failure_closes_page() {
    let (orchestrator, stats) = orchestrator(
        fast_config(),
        MockPageConfig::default().with_navigation_error("net::ERR_NAME_NOT_RESOLVED"),
    );
    let request = CaptureRequest::new("https://nowhere.invalid").with_viewport(small());

    let err = orchestrator.capture_full_page(&request).await.unwrap_err();

    assert!(matches!(err.inner_kind(), CaptureError::Browser { .. }));
    assert!(err.to_string().contains("https://nowhere.invalid"));
    assert_eq!(stats.pages_opened(), 1);
    assert_eq!(stats.pages_closed(), 1);
    assert_eq!(orchestrator.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_timeout_uses_config() {
    let (orchestrator, _) = orchestrator(
        fast_config().with_timeout_ms(1000),
        MockPageConfig::default().with_navigation_delay(Duration::from_secs(5)),
    );
    let request = CaptureRequest::new("https://slow.example").with_viewport(small());

    let err = orchestrator.capture_full_page(&request).await.unwrap_err();

    assert!(matches!(err.inner_kind(), CaptureError::Timeout { duration_ms: 1000, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_stability_delay_applied_by_default() {
    let (orchestrator, _) = orchestrator(CaptureConfig::default(), MockPageConfig::default());
    let request = CaptureRequest::new("https://example.com").with_viewport(small());

    let start = Instant::now();
    orchestrator.capture_full_page(&request).await.unwrap();

    assert_elapsed(start, 2500);
}

#[tokio::test(start_paused = true)]
async fn test_stability_delay_and_extra_delay_are_independent() {
    let (orchestrator, _) = orchestrator(CaptureConfig::default(), MockPageConfig::default());

    let both = CaptureRequest::new("https://example.com")
        .with_viewport(small())
        .with_delay(1000);
    let start = Instant::now();
    orchestrator.capture_full_page(&both).await.unwrap();
    assert_elapsed(start, 3500);

    let extra_only = both.clone().with_standard_delay(false);
    let start = Instant::now();
    orchestrator.capture_full_page(&extra_only).await.unwrap();
    assert_elapsed(start, 1000);
}

#[tokio::test(start_paused = true)]
async fn test_selector_wait_condition() {
    let (orchestrator, _) = orchestrator(
        fast_config(),
        MockPageConfig::default().with_delayed_element("#app", Duration::from_millis(300)),
    );
    let request = CaptureRequest::new("https://example.com")
        .with_viewport(small())
        .with_wait_for(WaitFor::new(WaitKind::Selector, "#app"));

    orchestrator.capture_full_page(&request).await.unwrap();
}

#[tokio::test]
async fn test_unsafe_wait_selector_is_wrapped() {
    let (orchestrator, stats) = orchestrator(fast_config(), MockPageConfig::default());
    let request = CaptureRequest::new("https://example.com")
        .with_viewport(small())
        .with_wait_for(WaitFor::new(WaitKind::Selector, "javascript:alert(1)"));

    let err = orchestrator.capture_full_page(&request).await.unwrap_err();

    assert!(matches!(err.inner_kind(), CaptureError::UnsafeSelector { .. }));
    assert_eq!(stats.open_pages(), 0);
}

#[tokio::test]
async fn test_invalid_timeout_wait_value_is_wrapped() {
    let (orchestrator, stats) = orchestrator(fast_config(), MockPageConfig::default());
    let request = CaptureRequest::new("https://example.com")
        .with_wait_for(WaitFor::new(WaitKind::Timeout, "a while"));

    let err = orchestrator.capture_full_page(&request).await.unwrap_err();

    assert!(matches!(err.inner_kind(), CaptureError::InvalidWaitCondition { .. }));
    assert_eq!(stats.pages_opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_network_idle_wait_times_out_under_chatter() {
    let (orchestrator, stats) = orchestrator(
        fast_config(),
        MockPageConfig::default().with_network_chatter(Duration::from_millis(100)),
    );
    let request = CaptureRequest::new("https://busy.example")
        .with_viewport(small())
        .with_wait_for(
            WaitFor::new(WaitKind::NetworkIdle, "500").with_timeout(2000),
        );

    let err = orchestrator.capture_full_page(&request).await.unwrap_err();

    assert!(matches!(err.inner_kind(), CaptureError::Timeout { duration_ms: 2000, .. }));
    assert_eq!(stats.open_pages(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_network_idle_wait_on_quiet_page() {
    let (orchestrator, _) = orchestrator(fast_config(), MockPageConfig::default());
    let request = CaptureRequest::new("https://example.com")
        .with_viewport(small())
        .with_wait_for(WaitFor::new(WaitKind::NetworkIdle, "500"));

    let start = Instant::now();
    orchestrator.capture_full_page(&request).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(500));
    assert!(start.elapsed() < Duration::from_millis(1000));
}

#[tokio::test]
async fn test_launch_failure_is_wrapped() {
    let launcher = MockLauncher::default().with_launch_error("Could not auto detect a chrome executable");
    let orchestrator = CaptureOrchestrator::new(fast_config(), Arc::new(launcher));
    let request = CaptureRequest::new("https://example.com");

    let err = orchestrator.capture_full_page(&request).await.unwrap_err();

    assert!(matches!(err.inner_kind(), CaptureError::Browser { .. }));
    assert!(err.inner_kind().remediation_hint().contains("WEBSHOT_CHROME_PATH"));
    assert!(!orchestrator.is_initialized().await);
}

// Element capture

#[tokio::test]
async fn test_element_capture() {
    let (orchestrator, stats) = orchestrator(
        fast_config(),
        MockPageConfig::default()
            .with_title("ignored")
            .with_element(".nav-bar", 180, 40),
    );

    let output = orchestrator
        .capture_element(
            "https://example.com",
            Some("  .nav-bar "),
            &ElementCaptureOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(output.dimensions(), (180, 40));
    assert_eq!(output.metadata.selector.as_deref(), Some(".nav-bar"));
    assert!(output.metadata.title.is_none());
    assert!(output.metadata.viewport.is_none());
    assert_eq!(stats.navigations()[0].1, WaitUntil::NetworkIdle2);
    assert_eq!(stats.open_pages(), 0);
}

#[tokio::test]
async fn test_element_not_found_names_selector() {
    let (orchestrator, stats) = orchestrator(fast_config(), MockPageConfig::default());

    let err = orchestrator
        .capture_element(
            "https://example.com",
            Some("#missing"),
            &ElementCaptureOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CaptureError::ElementNotFound { ref selector } if selector == "#missing"));
    assert!(err.to_string().contains("#missing"));
    assert_eq!(stats.open_pages(), 0);
}

#[tokio::test]
async fn test_element_selector_validation() {
    let (orchestrator, stats) = orchestrator(fast_config(), MockPageConfig::default());
    let options = ElementCaptureOptions::default();

    let missing = orchestrator
        .capture_element("https://example.com", None, &options)
        .await
        .unwrap_err();
    assert!(matches!(missing, CaptureError::InvalidSelector { .. }));

    let unsafe_selector = orchestrator
        .capture_element("https://example.com", Some("img[onerror=alert(1)]"), &options)
        .await
        .unwrap_err();
    assert!(matches!(unsafe_selector, CaptureError::UnsafeSelector { .. }));

    let bad_url = orchestrator
        .capture_element("javascript:alert(1)", Some("#x"), &options)
        .await
        .unwrap_err();
    assert!(matches!(bad_url, CaptureError::InvalidUrl { .. }));

    assert_eq!(stats.launches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_element_capture_bypasses_admission_gate() {
    let (orchestrator, _) = orchestrator(
        fast_config().with_max_concurrent(1),
        MockPageConfig::default()
            .with_navigation_delay(Duration::from_millis(500))
            .with_element("#hero", 50, 50),
    );
    let orchestrator = Arc::new(orchestrator);

    let full_page = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            let request = CaptureRequest::new("https://example.com").with_viewport(small());
            orchestrator.capture_full_page(&request).await
        })
    };
    tokio::task::yield_now().await;
    assert_eq!(orchestrator.active_count(), 1);

    let element = orchestrator
        .capture_element("https://example.com", Some("#hero"), &ElementCaptureOptions::default())
        .await;

    assert!(element.is_ok());
    assert!(full_page.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_element_capture_applies_viewport_option() {
    let (orchestrator, stats) = orchestrator(
        fast_config(),
        MockPageConfig::default().with_element("#hero", 40, 20),
    );
    let options = ElementCaptureOptions {
        viewport: Some(ViewportParams::preset("tablet")),
        ..Default::default()
    };

    let output = orchestrator
        .capture_element("https://example.com", Some("#hero"), &options)
        .await
        .unwrap();

    // Tablet renders at 2x
    assert_eq!(output.dimensions(), (80, 40));
    assert_eq!(stats.viewports()[0].width, 768);
    assert!(output.metadata.viewport.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_element_capture_stability_delay() {
    let (orchestrator, _) = orchestrator(
        CaptureConfig::default(),
        MockPageConfig::default().with_element("#hero", 10, 10),
    );

    let start = Instant::now();
    orchestrator
        .capture_element("https://example.com", Some("#hero"), &ElementCaptureOptions::default())
        .await
        .unwrap();
    assert_elapsed(start, 2500);

    let no_delay = ElementCaptureOptions {
        standard_delay: false,
        ..Default::default()
    };
    let start = Instant::now();
    orchestrator
        .capture_element("https://example.com", Some("#hero"), &no_delay)
        .await
        .unwrap();
    assert_elapsed(start, 0);
}
