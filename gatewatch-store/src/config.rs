//! Configuration management.

use gatewatch_fetch::{Credentials, FetchContext, FetchError, FetchSettings, RetryStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::StoreError;
use crate::persistence::{default_config_dir, save_json};

// ============================================================================
// Config
// ============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Configured devices.
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Polling and logging settings shared by every device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Seconds between polls in watch mode.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Retries for transient network errors.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Consecutive authentication failures before a device is disabled.
    #[serde(default = "default_max_auth_failures")]
    pub max_auth_failures: u32,
    /// Consecutive failed cycles before a device is unavailable.
    #[serde(default = "default_unavailable_after")]
    pub unavailable_after: u32,
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One device to poll.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique name.
    pub name: String,
    /// Host name, IP address or base URL.
    pub host: String,
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Login password.
    #[serde(default)]
    pub password: String,
    /// Pinned profile id; discovery runs when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Whether this device is polled.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_poll_interval() -> u64 {
    300
}

fn default_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_max_auth_failures() -> u32 {
    3
}

fn default_unavailable_after() -> u32 {
    3
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            max_auth_failures: default_max_auth_failures(),
            unavailable_after: default_unavailable_after(),
            log_level: default_log_level(),
        }
    }
}

impl GeneralConfig {
    /// Poll interval as a duration, never below one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Fetch settings derived from this configuration.
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
            retry: RetryStrategy::new(self.max_retries.saturating_add(1)),
            max_auth_failures: self.max_auth_failures.max(1),
            unavailable_after: self.unavailable_after.max(1),
            ..FetchSettings::default()
        }
    }

    /// Builds a fetch context with these settings.
    pub fn fetch_context(&self) -> Result<FetchContext, FetchError> {
        FetchContext::with_settings(self.fetch_settings())
    }
}

impl DeviceConfig {
    /// Creates an enabled device without a pinned profile.
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            username: String::new(),
            password: String::new(),
            profile: None,
            enabled: true,
        }
    }

    /// Sets the login.
    #[must_use]
    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Pins a profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Base URL of the device; a bare host gets `http://`.
    pub fn base_url(&self) -> Result<Url, StoreError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(StoreError::Config(format!("device {} has no host", self.name)));
        }
        let raw = if host.contains("://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };
        Url::parse(&raw).map_err(|e| StoreError::Config(format!("device {}: invalid host {host:?}: {e}", self.name)))
    }

    /// Login credentials.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("profile", &self.profile)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl Config {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_dir().join("config.json")
    }

    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads configuration from a specific path.
    ///
    /// A missing file is the default configuration.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;

        info!(path = %path.display(), devices = config.devices.len(), "Loaded configuration");
        Ok(config)
    }

    /// Validates and writes the configuration, owner-only.
    pub async fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        self.validate()?;
        save_json(path, self).await?;
        info!(path = %path.display(), devices = self.devices.len(), "Saved configuration");
        Ok(())
    }

    /// Adds a device, rejecting duplicate names.
    pub fn add_device(&mut self, device: DeviceConfig) -> Result<(), StoreError> {
        if self.device(&device.name).is_some() {
            return Err(StoreError::DuplicateDevice(device.name));
        }
        device.base_url()?;
        self.devices.push(device);
        Ok(())
    }

    /// Checks device names and hosts.
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut names = HashSet::new();
        for device in &self.devices {
            if device.name.trim().is_empty() {
                return Err(StoreError::Config("device with empty name".to_string()));
            }
            if !names.insert(device.name.as_str()) {
                return Err(StoreError::DuplicateDevice(device.name.clone()));
            }
            device.base_url()?;
        }
        Ok(())
    }

    /// Returns a device by name.
    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Returns the enabled devices.
    pub fn enabled_devices(&self) -> impl Iterator<Item = &DeviceConfig> {
        self.devices.iter().filter(|d| d.enabled)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"devices":[{"name":"modem","host":"192.168.100.1"}]}"#).unwrap();
        assert_eq!(config.general, GeneralConfig::default());
        let device = &config.devices[0];
        assert!(device.enabled);
        assert!(device.profile.is_none());
        assert!(device.credentials().is_anonymous());
    }

    #[test]
    fn test_base_url() {
        let device = DeviceConfig::new("modem", "192.168.100.1");
        assert_eq!(device.base_url().unwrap().as_str(), "http://192.168.100.1/");

        let device = DeviceConfig::new("modem", "https://10.0.0.1:8443");
        assert_eq!(device.base_url().unwrap().as_str(), "https://10.0.0.1:8443/");

        assert!(DeviceConfig::new("modem", "  ").base_url().is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let config = Config {
            general: GeneralConfig::default(),
            devices: vec![
                DeviceConfig::new("modem", "192.168.100.1"),
                DeviceConfig::new("modem", "192.168.0.1"),
            ],
        };
        assert!(matches!(config.validate(), Err(StoreError::DuplicateDevice(_))));
    }

    #[test]
    fn test_fetch_settings_from_general() {
        let general = GeneralConfig {
            timeout_secs: 4,
            max_retries: 0,
            max_auth_failures: 5,
            ..GeneralConfig::default()
        };
        let settings = general.fetch_settings();
        assert_eq!(settings.timeout, Duration::from_secs(4));
        assert_eq!(settings.retry.max_attempts, 1);
        assert_eq!(settings.max_auth_failures, 5);
    }

    #[test]
    fn test_debug_redacts_password() {
        let device = DeviceConfig::new("modem", "192.168.100.1").with_login("admin", "hunter2");
        let debug = format!("{device:?}");
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config
            .add_device(DeviceConfig::new("modem", "192.168.100.1").with_profile("arris_sb8200"))
            .unwrap();
        assert!(config.add_device(DeviceConfig::new("modem", "10.0.0.1")).is_err());
        config.save_to(&path).await.unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert!(config.devices.is_empty());
    }
}
