//! Browser engines and the capture building blocks
//!
//! # Architecture
//!
//! The orchestrator talks to a browser only through capability traits:
//!
//! - [`BrowserLauncher`] - Start a browser process
//! - [`BrowserSession`] - Hand out request-scoped pages
//! - [`PageHandle`] - Emulate, navigate, wait, screenshot
//!
//! ## Engines
//!
//! | Engine | Launcher | Use |
//! |--------|----------|-----|
//! | Chromium (CDP) | [`ChromiumLauncher`] | Production |
//! | Mock | [`mock::MockLauncher`] | Tests, development |
//!
//! # Core Types
//!
//! - [`NetworkActivity`] - Shared request/response tracker for idle detection
//! - [`ImageBuffer`] - Image wrapper with decode, resize and PNG encode
//! - [`wait`] - The post-navigation wait protocol

pub mod chromium;
pub mod constants;
pub mod image_buffer;
pub mod mock;
pub mod network;
pub mod traits;
pub mod wait;

pub use chromium::ChromiumLauncher;
pub use image_buffer::ImageBuffer;
pub use network::NetworkActivity;
pub use traits::{BrowserLauncher, BrowserSession, PageHandle};
