//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use gatewatch_store::{Config, DeviceConfig, StoreError, ensure_dir, profiles_dir_for};
use tracing::info;

use super::load_config;
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show configuration paths.
    Path,

    /// Show current configuration (passwords hidden).
    Show,

    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Add a device.
    Add {
        /// Device name.
        name: String,
        /// Host name, IP address or base URL.
        host: String,
        /// Login name.
        #[arg(long, short, default_value = "")]
        username: String,
        /// Login password.
        #[arg(long, short, default_value = "")]
        password: String,
        /// Pin a profile instead of discovering it.
        #[arg(long)]
        profile: Option<String>,
    },

    /// Remove a device.
    Remove {
        /// Device name.
        name: String,
    },
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Path => show_paths(cli),
        ConfigAction::Show => show_config(cli),
        ConfigAction::Init { force } => init_config(*force, cli).await,
        ConfigAction::Add {
            name,
            host,
            username,
            password,
            profile,
        } => {
            let mut device = DeviceConfig::new(name.clone(), host.clone()).with_login(username.clone(), password.clone());
            device.profile.clone_from(profile);
            add_device(device, cli).await
        }
        ConfigAction::Remove { name } => remove_device(name, cli).await,
    }
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_path = cli.config_path();
    let profiles_dir = profiles_dir_for(&config_path);

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config file:  {}", config_path.display());
            println!("Profiles dir: {}", profiles_dir.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_file": config_path.display().to_string(),
                "profiles_dir": profiles_dir.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

/// Copy of the configuration safe to print.
fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    for device in &mut config.devices {
        if !device.password.is_empty() {
            device.password = "********".to_string();
        }
    }
    config
}

fn show_config(cli: &Cli) -> Result<()> {
    let config = redacted(&load_config(cli)?);

    match cli.format {
        OutputFormat::Text => {
            let general = &config.general;
            println!("Gatewatch Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("Poll interval:      {}s", general.poll_interval_secs);
            println!("Request timeout:    {}s", general.timeout_secs);
            println!("Max retries:        {}", general.max_retries);
            println!("Max auth failures:  {}", general.max_auth_failures);
            println!("Unavailable after:  {} failed polls", general.unavailable_after);
            println!("Log level:          {}", general.log_level);
            println!();
            println!("Devices:");
            if config.devices.is_empty() {
                println!("  (none)");
            }
            for device in &config.devices {
                let profile = device.profile.as_deref().unwrap_or("auto");
                let state = if device.enabled { "" } else { " [disabled]" };
                println!("  • {} → {} (profile: {}){}", device.name, device.host, profile, state);
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&config)?);
        }
    }

    Ok(())
}

async fn init_config(force: bool, cli: &Cli) -> Result<()> {
    let path = cli.config_path();
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    Config::default().save_to(&path).await?;
    ensure_dir(&profiles_dir_for(&path)).await?;

    info!(path = %path.display(), "Configuration initialised");
    println!("Wrote {}", path.display());
    Ok(())
}

async fn add_device(device: DeviceConfig, cli: &Cli) -> Result<()> {
    let path = cli.config_path();
    let mut config = load_config(cli)?;
    let name = device.name.clone();

    config.add_device(device)?;
    config.save_to(&path).await?;

    info!(device = %name, "Device added");
    println!("Added: {name}");
    Ok(())
}

async fn remove_device(name: &str, cli: &Cli) -> Result<()> {
    let path = cli.config_path();
    let mut config = load_config(cli)?;

    let before = config.devices.len();
    config.devices.retain(|d| d.name != name);
    if config.devices.len() == before {
        return Err(StoreError::DeviceNotFound(name.to_string()).into());
    }
    config.save_to(&path).await?;

    info!(device = %name, "Device removed");
    println!("Removed: {name}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_hides_passwords() {
        let mut config = Config::default();
        config
            .add_device(DeviceConfig::new("modem", "192.168.100.1").with_login("admin", "hunter2"))
            .unwrap();
        config.add_device(DeviceConfig::new("open", "192.168.0.1")).unwrap();

        let shown = redacted(&config);
        let json = serde_json::to_string(&shown).unwrap();
        assert!(!json.contains("hunter2"));
        assert_eq!(shown.devices[0].password, "********");
        assert!(shown.devices[1].password.is_empty());
        assert_eq!(config.devices[0].password, "hunter2");
    }
}
