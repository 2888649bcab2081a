//! CLI command implementations.

pub mod config;
pub mod discover;
pub mod poll;
pub mod profiles;
pub mod restart;
pub mod watch;

use anyhow::{Context, Result};
use futures::future::join_all;
use gatewatch_store::{Config, DeviceStore, ProfileCatalog, profiles_dir_for};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::Cli;

/// Some devices produced no usable data.
#[derive(Debug, Error)]
#[error("{count} device(s) returned no usable data")]
pub struct UnusableResults {
    /// Number of devices.
    pub count: usize,
}

/// Loads the configuration named on the command line.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config_path();
    Config::load_from(&path).with_context(|| format!("loading {}", path.display()))
}

/// Loads the built-in and user profiles.
pub async fn load_catalog(cli: &Cli) -> Result<ProfileCatalog> {
    let dir = profiles_dir_for(&cli.config_path());
    let (catalog, skipped) = ProfileCatalog::load(&dir).await?;
    if !cli.quiet {
        for e in &skipped {
            eprintln!("Warning: {e}");
        }
    }
    Ok(catalog)
}

/// Builds a store holding the enabled devices, or just `only` when given.
///
/// Devices whose profile cannot be resolved are reported and left out.
pub async fn load_store(cli: &Cli, config: &Config, only: Option<&str>) -> Result<DeviceStore> {
    let catalog = load_catalog(cli).await?;
    let ctx = Arc::new(config.general.fetch_context()?);
    let store = DeviceStore::new(ctx, catalog);

    let devices: Vec<_> = match only {
        Some(name) => vec![
            config
                .device(name)
                .cloned()
                .ok_or_else(|| gatewatch_store::StoreError::DeviceNotFound(name.to_string()))?,
        ],
        None => config.enabled_devices().cloned().collect(),
    };

    let added = join_all(devices.into_iter().map(|device| {
        let store = &store;
        async move {
            let name = device.name.clone();
            (name, store.add_device(device).await)
        }
    }))
    .await;

    for (name, outcome) in added {
        if let Err(e) = outcome {
            if only.is_some() {
                return Err(e.into());
            }
            warn!(device = %name, error = %e, "Device skipped");
            if !cli.quiet {
                eprintln!("Warning: {name}: {e}");
            }
        }
    }

    Ok(store)
}
