//! Discover command - probe a device and rank profiles.

use anyhow::Result;
use clap::Args;
use gatewatch_store::{DeviceConfig, DeviceStore, StoreError};
use std::sync::Arc;

use super::{load_catalog, load_config};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for discover command.
#[derive(Args)]
pub struct DiscoverArgs {
    /// Host name, IP address or base URL to probe.
    #[arg(long, short = 'H', conflicts_with = "device")]
    pub host: Option<String>,

    /// Configured device to probe.
    #[arg(long, short)]
    pub device: Option<String>,
}

/// Runs the discover command.
pub async fn run(args: &DiscoverArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let target = match (&args.host, &args.device) {
        (Some(host), _) => DeviceConfig::new("discover", host.clone()),
        (None, Some(name)) => config
            .device(name)
            .cloned()
            .ok_or_else(|| StoreError::DeviceNotFound(name.clone()))?,
        (None, None) => anyhow::bail!("Pass --host or --device"),
    };

    let ctx = Arc::new(config.general.fetch_context()?);
    let store = DeviceStore::new(ctx, load_catalog(cli).await?);
    let outcome = store.discover_for(&target).await?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_discovery(&outcome));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_discovery(&outcome)?);
        }
    }

    Ok(())
}
