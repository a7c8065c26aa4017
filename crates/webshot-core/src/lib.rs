//! webshot-core: Headless-browser web page screenshot library
//!
//! This library captures full-page and element screenshots of web pages
//! through a shared headless browser. It includes input validation, device
//! presets, a post-navigation wait protocol, image size normalization, an
//! admission-controlled orchestrator, and error handling with remediation
//! hints for LLM clients.

pub mod capture;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod presets;
pub mod validation;

pub use config::CaptureConfig;
pub use error::{CaptureError, CaptureResult};
pub use orchestrator::CaptureOrchestrator;
