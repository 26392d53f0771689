//! pedal-feedback daemon
//!
//! Reads key events from a foot switch (or any keyboard), tracks which pedal
//! halves are lit and writes every change to stdout.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use pedal_feedback_config::Config;
use pedal_feedback_tracker::{
    render_json, render_text, KeyConfig, OutputFormat, Snapshot, TrackerOptions, TrackerService,
};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

use pedal_feedback_daemon::device::{self, DeviceSelector};
use pedal_feedback_daemon::source;

#[derive(Parser, Debug)]
#[command(name = "pedal-feedbackd")]
#[command(about = "Live pedal input feedback from a foot switch")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/pedal-feedback/config.kdl")]
    config: String,

    /// Input device: /dev/input path, vendor:product or device name
    /// (overrides the config file)
    #[arg(short, long)]
    device: Option<String>,

    /// Output format for snapshots: text or json
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::warn!(
            "Config file {} not found, using the default pedals",
            path.display()
        );
        return Ok(Config::default());
    }

    tracing::info!("Loading configuration from {}", path.display());
    let config = pedal_feedback_config::parse_config(path)?;
    Ok(config)
}

/// Write every published snapshot until the tracker shuts down.
fn spawn_renderer(
    snapshots: tokio::sync::watch::Receiver<Snapshot>,
    keys: KeyConfig,
    format: OutputFormat,
) -> JoinHandle<Result<()>> {
    tokio::spawn(async move {
        let mut stream = WatchStream::new(snapshots);

        while let Some(snapshot) = stream.next().await {
            let rendered = match format {
                OutputFormat::Text => render_text(&keys, &snapshot),
                OutputFormat::Json => render_json(&snapshot)?,
            };

            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", rendered).context("Failed to write to stdout")?;
            stdout.flush()?;
        }

        Ok(())
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the snapshots. Until the config is
    // loaded the level comes from RUST_LOG or defaults to info.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();
    let config = load_config(&config_path)?;

    if !filter_from_env {
        filter_handle.reload(EnvFilter::new(config.global.log_level.as_str()))?;
    }

    tracing::info!(
        "Loaded configuration with {} key(s), highlight {}ms, history limit {}",
        config.keys.len(),
        config.global.highlight_duration_ms,
        config.global.history_limit
    );

    let selector = DeviceSelector::parse(args.device.as_deref().or(config.global.device.as_deref()));
    let (input, info) = device::select_device(&selector)?;

    let mut tracker = TrackerService::spawn(TrackerOptions::from(&config));
    let renderer = spawn_renderer(tracker.subscribe(), config.keys.clone(), args.format);

    let mut reader = source::spawn_device_source(input, &info, tracker.key_sender())?;
    tracker.attach_source(&reader);

    tracing::info!("pedal-feedback daemon running, press Ctrl-C to stop");

    let outcome = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            tracing::info!("Shutting down...");
            Ok(())
        }
        result = &mut reader => match result {
            Ok(Ok(())) => {
                tracing::info!("Input device '{}' closed", info.name);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(e) => Err(anyhow::Error::new(e).context("Device reader task failed")),
        },
    };

    let last = tracker.dispose().await;
    tracing::debug!("Tracker disposed with {} history item(s)", last.history.len());

    match renderer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Renderer stopped: {:#}", e),
        Err(e) => tracing::warn!("Renderer task failed: {}", e),
    }

    outcome
}
