//! webshot-cli: Command-line tool for web page capture debugging
//!
//! Runs the same capture pipeline as the MCP server without the protocol
//! layer. Images are written to `--out`; metadata is printed as JSON.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use webshot_core::{
    CaptureConfig, CaptureOrchestrator,
    model::{
        CaptureOutput, CaptureRequest, ElementCaptureOptions, ViewportParams, WaitFor, WaitKind,
        WaitUntil, WaitValue,
    },
    presets::format_presets,
};

#[derive(Parser)]
#[command(name = "webshot-cli")]
#[command(about = "CLI tool for web page screenshot debugging and testing")]
struct Cli {
    /// Show the browser window instead of running headless
    #[arg(long, global = true)]
    headed: bool,
    /// Per-operation timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    /// Chrome/Chromium executable to launch
    #[arg(long, global = true)]
    chrome_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a full-page screenshot
    Capture {
        /// URL to capture (http or https)
        url: String,
        #[command(flatten)]
        viewport: ViewportArgs,
        /// Wait condition type (selector, function, timeout, networkidle)
        #[arg(long)]
        wait_type: Option<WaitKind>,
        /// Wait condition value (selector, predicate, or milliseconds)
        #[arg(long, requires = "wait_type")]
        wait_value: Option<String>,
        /// Wait condition timeout in milliseconds
        #[arg(long, requires = "wait_type")]
        wait_timeout: Option<u64>,
        /// Navigation completion condition
        #[arg(long, default_value = "networkidle2")]
        wait_until: WaitUntil,
        /// Extra delay in milliseconds before capturing
        #[arg(long)]
        delay: Option<u64>,
        /// Skip the post-navigation stability delay
        #[arg(long)]
        no_standard_delay: bool,
        /// Output PNG path
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Capture the first element matching a CSS selector
    Element {
        /// URL to capture (http or https)
        url: String,
        /// CSS selector of the element
        #[arg(long)]
        selector: String,
        #[command(flatten)]
        viewport: ViewportArgs,
        /// Extra delay in milliseconds before capturing
        #[arg(long)]
        delay: Option<u64>,
        /// Skip the post-navigation stability delay
        #[arg(long)]
        no_standard_delay: bool,
        /// Output PNG path
        #[arg(short, long)]
        out: PathBuf,
    },
    /// List the built-in device presets
    Presets,
}

#[derive(Args)]
struct ViewportArgs {
    /// Device preset (mobile, tablet, desktop)
    #[arg(long)]
    preset: Option<String>,
    /// Viewport width in pixels
    #[arg(long)]
    width: Option<u32>,
    /// Viewport height in pixels
    #[arg(long)]
    height: Option<u32>,
    /// Device scale factor
    #[arg(long)]
    scale: Option<f64>,
    /// Emulate a mobile device
    #[arg(long)]
    mobile: bool,
    /// Emulate touch input
    #[arg(long)]
    touch: bool,
    /// Custom user agent
    #[arg(long)]
    user_agent: Option<String>,
}

impl ViewportArgs {
    fn into_params(self) -> Option<ViewportParams> {
        let params = ViewportParams {
            preset: self.preset,
            width: self.width,
            height: self.height,
            device_scale_factor: self.scale,
            is_mobile: self.mobile.then_some(true),
            has_touch: self.touch.then_some(true),
            user_agent: self.user_agent,
        };
        (params != ViewportParams::default()).then_some(params)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("webshot_cli=info".parse()?)
                .add_directive("webshot_core=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Presets = cli.command {
        print!("{}", format_presets());
        return Ok(());
    }

    let mut config = CaptureConfig::from_env();
    if cli.headed {
        config = config.with_headless(false);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_timeout_ms(timeout_ms);
    }
    if let Some(path) = cli.chrome_path {
        config = config.with_chrome_executable(path);
    }
    config.validate()?;

    let orchestrator = CaptureOrchestrator::chromium(config);
    let result = run(&orchestrator, cli.command).await;

    if let Err(e) = orchestrator.shutdown().await {
        warn!(error = %e, "Browser did not close cleanly");
    }
    result
}

async fn run(orchestrator: &CaptureOrchestrator, command: Commands) -> Result<()> {
    match command {
        Commands::Capture {
            url,
            viewport,
            wait_type,
            wait_value,
            wait_timeout,
            wait_until,
            delay,
            no_standard_delay,
            out,
        } => {
            let request = CaptureRequest {
                url,
                viewport: viewport.into_params(),
                wait_for: wait_type.map(|kind| WaitFor {
                    kind,
                    value: wait_value.map(WaitValue::from),
                    timeout: wait_timeout,
                    idle_time: None,
                }),
                delay,
                wait_until,
                standard_delay: !no_standard_delay,
            };
            let output = orchestrator.capture_full_page(&request).await?;
            write_output(&output, &out)
        }
        Commands::Element {
            url,
            selector,
            viewport,
            delay,
            no_standard_delay,
            out,
        } => {
            let options = ElementCaptureOptions {
                viewport: viewport.into_params(),
                delay,
                standard_delay: !no_standard_delay,
            };
            let output = orchestrator
                .capture_element(&url, Some(&selector), &options)
                .await?;
            write_output(&output, &out)
        }
        Commands::Presets => {
            print!("{}", format_presets());
            Ok(())
        }
    }
}

fn write_output(output: &CaptureOutput, out: &Path) -> Result<()> {
    fs::write(out, &output.data).with_context(|| format!("failed to write {}", out.display()))?;

    let (width, height) = output.dimensions();
    eprintln!("Saved {}x{} PNG to {}", width, height, out.display());
    println!("{}", serde_json::to_string_pretty(&output.metadata)?);
    Ok(())
}
