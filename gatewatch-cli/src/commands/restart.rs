//! Restart command.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{load_config, load_store};
use crate::{Cli, OutputFormat};

/// Arguments for restart command.
#[derive(Args)]
pub struct RestartArgs {
    /// Device to restart.
    #[arg(long, short)]
    pub device: String,
}

/// Runs the restart command. The command is sent once, never retried.
pub async fn run(args: &RestartArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let store = load_store(cli, &config, Some(&args.device)).await?;

    store.restart(&args.device).await?;
    info!(device = %args.device, "Restart sent");

    match cli.format {
        OutputFormat::Text => println!("Restart command sent to {}", args.device),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "device": args.device, "restart": "sent" })
        ),
    }
    Ok(())
}
