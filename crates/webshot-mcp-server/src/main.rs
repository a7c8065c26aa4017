//! webshot-mcp: MCP server for headless-browser web page screenshots
//!
//! Serves MCP over stdio. Logs go to stderr because stdout carries the
//! protocol. The browser starts on the first capture and is closed on exit.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::{ServiceExt, transport::stdio};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use webshot_core::{CaptureConfig, CaptureOrchestrator};
use webshot_mcp_server::mcp::WebshotMcpServer;

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("webshot_mcp_server=info,webshot_core=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let config = CaptureConfig::from_env();
    config.validate().context("invalid configuration")?;
    info!(
        headless = config.headless,
        timeout_ms = config.timeout_ms,
        max_concurrent = config.max_concurrent,
        "webshot-mcp starting"
    );

    let orchestrator = Arc::new(CaptureOrchestrator::chromium(config));
    let server = WebshotMcpServer::new(Arc::clone(&orchestrator));

    let service = server.serve(stdio()).await?;
    info!("Waiting for MCP requests on stdio");

    tokio::select! {
        result = service.waiting() => {
            match result {
                Ok(reason) => info!(?reason, "MCP service ended"),
                Err(e) => error!(error = %e, "MCP service task failed"),
            }
        }
        _ = shutdown_signal() => info!("Termination signal received"),
    }

    if let Err(e) = orchestrator.shutdown().await {
        warn!(error = %e, "Browser did not close cleanly");
    }
    info!("webshot-mcp stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
