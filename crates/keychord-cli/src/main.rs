//! keychord CLI
//!
//! Validate binding configurations, replay scripted key events through
//! them, and try them live against an evdev keyboard.

mod device;
mod keymap;
mod listen;
mod replay;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use keychord_config::{Config, ConfigError, LogLevel};
use miette::IntoDiagnostic;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter, Registry};

#[derive(Parser, Debug)]
#[command(name = "keychord")]
#[command(about = "Keyboard shortcut binding tool")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = keychord_config::DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// Replay a JSON-lines key event script through the configured bindings
    Replay {
        /// Event script ("-" for stdin)
        script: PathBuf,

        /// Print fired actions as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// List available input devices
    Devices,

    /// Listen to a keyboard and print the actions it triggers
    Listen {
        /// evdev device path (e.g. /dev/input/event3)
        device: PathBuf,
    },
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Filter to start with: `RUST_LOG` if set, else the default level.
///
/// The flag is true when the filter came from the environment.
fn startup_filter() -> (EnvFilter, bool) {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(LogLevel::default().as_filter()), false),
    }
}

/// fmt subscriber whose filter can be swapped once the config is loaded.
fn build_subscriber<W>(
    filter: EnvFilter,
    writer: W,
) -> (impl Subscriber + Send + Sync + 'static, FilterHandle)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer));
    (subscriber, handle)
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Installed before parsing so config warnings are not lost
    let (filter, from_env) = startup_filter();
    let (subscriber, filter_handle) = build_subscriber(filter, std::io::stdout);
    subscriber.init();

    let config_path = keychord_config::expand_path(&cli.config);
    let config = match cli.command {
        Commands::Devices => None,
        _ => Some(keychord_config::parse_config(&config_path)),
    };

    // RUST_LOG wins; otherwise use the configured level
    if !from_env {
        if let Some(Ok(config)) = &config {
            filter_handle
                .reload(EnvFilter::new(config.global.log_level.as_filter()))
                .into_diagnostic()?;
        }
    }

    match (cli.command, config) {
        (Commands::Devices, _) => cmd_devices(),
        (Commands::Validate, Some(config)) => cmd_validate(&config_path, config),
        (Commands::Replay { script, json }, Some(config)) => cmd_replay(config?, &script, json),
        (Commands::Listen { device }, Some(config)) => cmd_listen(config?, &device),
        (_, None) => Err(miette::miette!("No configuration loaded")),
    }
}

fn cmd_validate(config_path: &Path, config: Result<Config, ConfigError>) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = config?;
    println!("Configuration is valid!");
    println!(
        "  Options: filter-editable={} repeat={}",
        config.options.filter_editable, config.options.repeat
    );
    println!("  Scopes: {}", config.scopes.len());
    for scope in &config.scopes {
        println!(
            "    - {} ({} binding(s){})",
            scope.name,
            scope.bindings.len(),
            if scope.enabled { "" } else { ", disabled" }
        );
        for binding in &scope.bindings {
            let chords: Vec<String> = binding.chords.iter().map(|c| c.describe()).collect();
            println!("        {} -> {}", chords.join(", "), binding.action);
        }
    }
    Ok(())
}

fn cmd_replay(config: Config, script: &Path, json: bool) -> miette::Result<()> {
    let content = if script == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).into_diagnostic()?
    } else {
        std::fs::read_to_string(script).into_diagnostic()?
    };

    let outcome = replay::run(&config, &content)?;

    if json {
        for fired in &outcome.fired {
            println!("{}", serde_json::to_string(fired).into_diagnostic()?);
        }
    } else {
        for fired in &outcome.fired {
            println!(
                "line {}: {} -> {} [{}]",
                fired.line, fired.keys, fired.action, fired.scope
            );
        }
        println!("{} action(s) fired", outcome.fired.len());
    }

    for fault in &outcome.faults {
        eprintln!("line {}: {}", fault.line, fault.message);
    }

    Ok(())
}

fn cmd_devices() -> miette::Result<()> {
    println!("Available input devices:\n");

    let devices = device::enumerate_devices().map_err(|e| miette::miette!("{:#}", e))?;
    for info in &devices {
        let device_type = if info.keyboard { "keyboard" } else { "other" };
        println!("  {} [{}]", info.name, device_type);
        println!("    Path: {}", info.path.display());
        println!("    ID: {}", info.vendor_product());
        println!();
    }

    Ok(())
}

fn cmd_listen(config: Config, device: &Path) -> miette::Result<()> {
    listen::run(&config, device).map_err(|e| miette::miette!("{:#}", e))
}
