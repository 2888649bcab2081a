//! Poll command - one cycle per device.

use anyhow::Result;
use clap::Args;
use gatewatch_core::PollResult;
use tracing::info;

use super::{UnusableResults, load_config, load_store};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for poll command.
#[derive(Args, Default)]
pub struct PollArgs {
    /// Device to poll (default: every enabled device).
    #[arg(long, short)]
    pub device: Option<String>,
}

/// Runs the poll command.
pub async fn run(args: &PollArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    if config.devices.is_empty() {
        anyhow::bail!(
            "No devices configured. Add one with: gatewatch config add <NAME> <HOST>"
        );
    }

    let store = load_store(cli, &config, args.device.as_deref()).await?;
    info!(devices = store.len().await, "Polling");

    let results = match &args.device {
        Some(name) => vec![(name.clone(), store.poll(name).await?)],
        None => store.poll_all().await,
    };

    print_results(&results, cli)?;

    let unusable = results.iter().filter(|(_, r)| !r.is_usable()).count();
    if unusable > 0 {
        return Err(UnusableResults { count: unusable }.into());
    }
    Ok(())
}

/// Prints results in the selected format.
pub fn print_results(results: &[(String, PollResult)], cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            let blocks: Vec<String> = results
                .iter()
                .map(|(name, result)| formatter.format_result(name, result))
                .collect();
            println!("{}", blocks.join("\n\n"));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_results(results)?);
        }
    }
    Ok(())
}
