//! pedal-feedback CLI
//!
//! Configuration and device tool for pedal-feedback.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use pedal_feedback_config::Config;
use pedal_feedback_daemon::device::{enumerate_devices, DeviceSelector};
use pedal_feedback_tracker::{render_json, render_text, OutputFormat, PedalTracker, TrackerOptions};

#[derive(Parser, Debug)]
#[command(name = "pedal-feedback")]
#[command(about = "Pedal input feedback tool")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/pedal-feedback/config.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// List available input devices
    Devices,

    /// Print the effective configuration as KDL
    PrintConfig,

    /// Feed each character of TEXT to a fresh tracker and print the result
    Replay {
        /// Key presses, one per character (e.g. "aAl")
        text: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();

    match cli.command {
        Commands::Validate => cmd_validate(&config_path),
        Commands::Devices => cmd_devices(),
        Commands::PrintConfig => cmd_print_config(&config_path),
        Commands::Replay { text, format } => cmd_replay(&config_path, &text, format),
    }
}

/// Parse the config file, or fall back to the default pedals when it does
/// not exist.
fn load_or_default(config_path: &Path) -> miette::Result<Config> {
    if !config_path.exists() {
        tracing::warn!(
            "Config file {} not found, using the default pedals",
            config_path.display()
        );
        return Ok(Config::default());
    }

    Ok(pedal_feedback_config::parse_config(config_path)?)
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = pedal_feedback_config::parse_config(config_path)?;

    println!("Configuration is valid!");
    println!("  Log level: {}", config.global.log_level.as_str());
    println!("  Highlight duration: {}ms", config.global.highlight_duration_ms);
    println!("  History limit: {}", config.global.history_limit);
    if let Some(device) = &config.global.device {
        println!("  Device: {}", device);
    }
    println!("  Keys: {}", config.keys.len());
    for (key, pedal) in config.keys.iter() {
        if pedal.double_tap_description.is_empty() {
            println!("    - {}: {}", key, pedal.label);
        } else {
            println!(
                "    - {}: {} / {}",
                key, pedal.label, pedal.double_tap_description
            );
        }
    }

    Ok(())
}

fn cmd_devices() -> miette::Result<()> {
    println!("Available input devices:\n");

    let devices = enumerate_devices().map_err(|e| miette::miette!("{:#}", e))?;
    let first_keyboard = devices
        .iter()
        .position(|info| DeviceSelector::FirstKeyboard.matches(info));

    for (index, info) in devices.iter().enumerate() {
        let marker = if Some(index) == first_keyboard {
            " (default)"
        } else {
            ""
        };

        println!("  {} [{}]{}", info.name, info.kind(), marker);
        println!("    Path: {}", info.path.display());
        println!("    ID: {}", info.vendor_product());
        println!();
    }

    Ok(())
}

fn cmd_print_config(config_path: &Path) -> miette::Result<()> {
    let config = load_or_default(config_path)?;
    let content = pedal_feedback_config::render_config(&config)?;
    print!("{}", content);
    Ok(())
}

fn cmd_replay(config_path: &Path, text: &str, format: OutputFormat) -> miette::Result<()> {
    let config = load_or_default(config_path)?;
    let mut tracker = PedalTracker::new(TrackerOptions::from(&config));

    // All presses land at the same instant, so every touched key is still lit
    let now = tokio::time::Instant::now();
    for ch in text.chars() {
        if tracker.handle_key_down(&ch.to_string(), now).is_none() {
            tracing::debug!("Ignored key {:?}", ch);
        }
    }

    let snapshot = tracker.snapshot();
    match format {
        OutputFormat::Text => print!("{}", render_text(tracker.key_config(), &snapshot)),
        OutputFormat::Json => println!("{}", render_json(&snapshot).into_diagnostic()?),
    }

    Ok(())
}
