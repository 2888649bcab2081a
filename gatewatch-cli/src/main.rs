// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Gatewatch CLI - cable modem signal monitoring from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Poll every configured device once
//! gatewatch
//!
//! # Poll one device, JSON output
//! gatewatch poll --device modem --format json --pretty
//!
//! # Find the profile for an unconfigured modem
//! gatewatch discover --host 192.168.100.1
//!
//! # Watch mode
//! gatewatch watch --interval 60
//!
//! # Add a device
//! gatewatch config add modem 192.168.100.1 --username admin --password secret
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use gatewatch_fetch::FetchError;
use gatewatch_store::StoreError;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{UnusableResults, config, discover, poll, profiles, restart, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// Gatewatch CLI - cable modem signal monitoring.
#[derive(Parser)]
#[command(name = "gatewatch")]
#[command(about = "Cable modem signal monitoring CLI")]
#[command(long_about = r"
Gatewatch logs into cable modem and gateway web interfaces and reports
downstream and upstream channel data, firmware version and uptime.

Supported devices:
  • ARRIS SB6141, SB8200, S33
  • Motorola MB8600
  • Netgear CM600, C7000
  • Technicolor TC4400
  • Hitron CODA-56
  • Ubee UBC1318

Unknown devices fall back to a raw capture of their status page.

Examples:
  gatewatch                           # Poll all configured devices
  gatewatch poll --device modem       # Poll one device
  gatewatch discover --host 10.0.0.1  # Identify a device
  gatewatch profiles                  # List profiles
")]
#[command(version)]
#[command(author = "Gatewatch Contributors")]
pub struct Cli {
    /// Subcommand to run. If none, runs 'poll' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Configuration file (default: platform config dir).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Configuration file in use.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(gatewatch_store::Config::default_path)
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Poll devices once (default if no command specified).
    #[command(visible_alias = "p")]
    Poll(poll::PollArgs),

    /// Poll repeatedly.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// Probe a device and rank the matching profiles.
    #[command(visible_alias = "d")]
    Discover(discover::DiscoverArgs),

    /// Send one restart command to a device.
    Restart(restart::RestartArgs),

    /// List built-in and user profiles.
    Profiles,

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Device or profile not found.
    NotFound = 2,
    /// At least one device returned no usable data.
    PollFailed = 3,
    /// Timeout.
    Timeout = 4,
}

impl ExitCode {
    /// Maps an error to the exit code scripts can branch on.
    pub fn for_error(err: &anyhow::Error) -> Self {
        if err.downcast_ref::<UnusableResults>().is_some() {
            return Self::PollFailed;
        }
        match err.downcast_ref::<StoreError>() {
            Some(StoreError::DeviceNotFound(_) | StoreError::UnknownProfile(_)) => Self::NotFound,
            Some(StoreError::Discovery(FetchError::Timeout(_))) => Self::Timeout,
            Some(StoreError::Poll(_)) => Self::PollFailed,
            _ => Self::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let filter = if cli.verbose {
        EnvFilter::new("gatewatch=debug,info")
    } else {
        // RUST_LOG wins over the configured level
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = gatewatch_store::Config::load_from(&cli.config_path())
                .map_or_else(|_| "warn".to_string(), |c| c.general.log_level);
            EnvFilter::try_new(format!("gatewatch={level}"))
                .unwrap_or_else(|_| EnvFilter::new("gatewatch=warn"))
        })
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli);

    let result = match &cli.command {
        Some(Commands::Poll(args)) => poll::run(args, &cli).await,
        Some(Commands::Watch(args)) => watch::run(args, &cli).await,
        Some(Commands::Discover(args)) => discover::run(args, &cli).await,
        Some(Commands::Restart(args)) => restart::run(args, &cli).await,
        Some(Commands::Profiles) => profiles::run(&cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli).await,
        None => poll::run(&poll::PollArgs::default(), &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}
