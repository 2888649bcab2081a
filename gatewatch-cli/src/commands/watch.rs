//! Watch command - poll on an interval until interrupted.

use anyhow::Result;
use clap::Args;
use std::io::{Write, stdout};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::info;

use super::poll::print_results;
use super::{load_config, load_store};
use crate::{Cli, OutputFormat};
use crate::output::TextFormatter;

/// Arguments for watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Refresh interval in seconds (default: from config).
    #[arg(long, short)]
    pub interval: Option<u64>,

    /// Device to watch (default: every enabled device).
    #[arg(long, short)]
    pub device: Option<String>,

    /// Minimum interval to use.
    #[arg(long, default_value = "10")]
    pub min_interval: u64,
}

/// Runs the watch command.
pub async fn run(args: &WatchArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let refresh = Duration::from_secs(
        args.interval
            .unwrap_or(config.general.poll_interval_secs)
            .max(args.min_interval),
    );

    let store = load_store(cli, &config, args.device.as_deref()).await?;
    if store.is_empty().await {
        anyhow::bail!("No devices to watch");
    }

    info!(interval = refresh.as_secs(), "Starting watch mode");

    let formatter = TextFormatter::new(!cli.no_color);
    let mut ticker = interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                return Ok(());
            }
        }

        let results = match &args.device {
            Some(name) => vec![(name.clone(), store.poll(name).await?)],
            None => store.poll_all().await,
        };

        if cli.format == OutputFormat::Text {
            // Clear screen
            print!("\x1b[2J\x1b[H");
            stdout().flush()?;
            println!("{}", formatter.format_watch_header(refresh));
            println!();
        }
        print_results(&results, cli)?;
        if cli.format == OutputFormat::Text {
            println!();
            println!("Press Ctrl+C to exit");
        }
    }
}
