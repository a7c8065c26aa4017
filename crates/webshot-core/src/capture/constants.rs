//! Centralized timing and limit constants for page capture.
//!
//! This module consolidates the fixed protocol values used across the capture
//! pipeline. Values that operators may tune at runtime live in
//! [`crate::config::CaptureConfig`]; the defaults for those are here too.
//!
//! # Runtime Configuration
//!
//! | Environment Variable | Default | Description |
//! |---------------------|---------|-------------|
//! | `WEBSHOT_HEADLESS` | true | Run the browser without a window |
//! | `WEBSHOT_TIMEOUT_MS` | 30000 | Navigation and generic wait timeout |
//! | `WEBSHOT_MAX_CONCURRENT` | 5 | Full-page admission ceiling |
//! | `WEBSHOT_CHROME_PATH` | auto-detect | Chrome/Chromium executable |
//! | `WEBSHOT_MAX_IMAGE_DIMENSION` | 8000 | Downscale cap for output images |
//!
//! # Timing Model
//!
//! A full-page capture spends its time in three places:
//!
//! 1. Navigation, bounded by the configured timeout
//! 2. The optional wait condition, bounded by its own timeout
//! 3. The stability delay plus any caller-requested delay
//!
//! Each deadline is local to its step; there is no overall budget.

/// Fixed delay applied after navigation so late rendering can settle.
///
/// Independent of the caller's `delay`; disabled only when the request sets
/// `standardDelay: false`.
pub const STABILITY_DELAY_MS: u64 = 2500;

/// Poll cadence for network-idle, selector and predicate waits.
pub const NETWORK_IDLE_POLL_MS: u64 = 100;

/// Overall timeout for a wait condition when the caller gives none.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Quiet period required by a `networkidle` wait when the caller gives none.
pub const DEFAULT_IDLE_TIME_MS: u64 = 2000;

/// Quiet period for the `networkidle0` / `networkidle2` navigation conditions.
pub const NAVIGATION_IDLE_MS: u64 = 500;

/// Default navigation timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default admission ceiling for concurrent full-page captures.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Largest width or height of a returned image.
///
/// Screenshots exceeding this on either axis are downscaled, preserving
/// aspect ratio, so that both axes fit.
pub const MAX_IMAGE_DIMENSION: u32 = 8000;

/// Default viewport width
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1920;

/// Default viewport height
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 1080;

/// Smallest accepted viewport width or height
pub const MIN_VIEWPORT_DIMENSION: u32 = 100;

/// Largest accepted viewport width or height
pub const MAX_VIEWPORT_DIMENSION: u32 = 5000;

/// Smallest accepted device scale factor
pub const MIN_SCALE_FACTOR: f64 = 0.1;

/// Largest accepted device scale factor
pub const MAX_SCALE_FACTOR: f64 = 3.0;

/// Flags passed to every launched browser process.
pub const BROWSER_LAUNCH_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-first-run",
    "--no-zygote",
];
