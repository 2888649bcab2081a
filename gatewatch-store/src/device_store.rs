//! Configured devices and their latest results.
//!
//! Each device owns one [`DataOrchestrator`] and therefore one session.
//! Devices share nothing mutable, so polls of different devices run in
//! parallel; polls of one device are serialized by its orchestrator.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use gatewatch_core::PollResult;
use gatewatch_fetch::FetchContext;
use gatewatch_profiles::{DataOrchestrator, DeviceHealth, DiscoveryOutcome, ResolvedProfile};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, instrument, warn};

use crate::catalog::ProfileCatalog;
use crate::config::DeviceConfig;
use crate::error::StoreError;

// ============================================================================
// Device Entry
// ============================================================================

/// One configured device.
#[derive(Debug)]
pub struct DeviceEntry {
    /// Its configuration.
    pub config: DeviceConfig,
    /// Its orchestrator.
    pub orchestrator: DataOrchestrator,
    /// True if the profile was found by discovery rather than pinned.
    pub discovered: bool,
}

impl DeviceEntry {
    /// Profile id in use.
    pub fn profile_id(&self) -> &str {
        self.orchestrator.profile().id()
    }
}

#[derive(Default)]
struct DeviceStoreInner {
    devices: BTreeMap<String, Arc<DeviceEntry>>,
    results: BTreeMap<String, PollResult>,
    last_poll: Option<DateTime<Utc>>,
}

// ============================================================================
// Device Store
// ============================================================================

/// All configured devices.
///
/// Observable via a watch channel that ticks on every change.
pub struct DeviceStore {
    ctx: Arc<FetchContext>,
    catalog: ProfileCatalog,
    inner: RwLock<DeviceStoreInner>,
    notify: watch::Sender<u64>,
}

impl DeviceStore {
    /// Creates an empty store.
    pub fn new(ctx: Arc<FetchContext>, catalog: ProfileCatalog) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            ctx,
            catalog,
            inner: RwLock::new(DeviceStoreInner::default()),
            notify,
        }
    }

    /// Profiles this store resolves devices against.
    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    // ========================================================================
    // Device Management
    // ========================================================================

    /// Adds a device, resolving its profile.
    ///
    /// A pinned profile is used as is; otherwise the device is probed.
    #[instrument(skip(self, config), fields(device = %config.name))]
    pub async fn add_device(&self, config: DeviceConfig) -> Result<Arc<DeviceEntry>, StoreError> {
        if self.inner.read().await.devices.contains_key(&config.name) {
            return Err(StoreError::DuplicateDevice(config.name));
        }

        let base = config.base_url()?;
        let (resolved, discovered) = match &config.profile {
            Some(id) => {
                let profile = self
                    .catalog
                    .get(id)
                    .ok_or_else(|| StoreError::UnknownProfile(id.clone()))?;
                (ResolvedProfile::from_profile(profile), false)
            }
            None => (self.discover_for(&config).await?.selected, true),
        };

        let orchestrator = DataOrchestrator::new(resolved, base, config.credentials(), Arc::clone(&self.ctx));
        let entry = Arc::new(DeviceEntry {
            config,
            orchestrator,
            discovered,
        });

        {
            let mut inner = self.inner.write().await;
            if inner.devices.contains_key(&entry.config.name) {
                return Err(StoreError::DuplicateDevice(entry.config.name.clone()));
            }
            inner.devices.insert(entry.config.name.clone(), Arc::clone(&entry));
        }
        self.notify_change();
        info!(profile = %entry.profile_id(), discovered, "Device added");
        Ok(entry)
    }

    /// Runs discovery for a device configuration without adding it.
    pub async fn discover_for(&self, config: &DeviceConfig) -> Result<DiscoveryOutcome, StoreError> {
        let base = config.base_url()?;
        Ok(self.catalog.discovery().discover(&self.ctx, &base).await?)
    }

    /// Removes a device; its session goes with it.
    pub async fn remove_device(&self, name: &str) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.write().await;
            inner
                .devices
                .remove(name)
                .ok_or_else(|| StoreError::DeviceNotFound(name.to_string()))?;
            inner.results.remove(name);
        }
        self.notify_change();
        info!(device = %name, "Device removed");
        Ok(())
    }

    /// Gets a device.
    pub async fn device(&self, name: &str) -> Option<Arc<DeviceEntry>> {
        self.inner.read().await.devices.get(name).cloned()
    }

    /// Device names, sorted.
    pub async fn device_names(&self) -> Vec<String> {
        self.inner.read().await.devices.keys().cloned().collect()
    }

    /// Number of devices.
    pub async fn len(&self) -> usize {
        self.inner.read().await.devices.len()
    }

    /// Returns true if no devices are configured.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.devices.is_empty()
    }

    async fn entry(&self, name: &str) -> Result<Arc<DeviceEntry>, StoreError> {
        self.device(name)
            .await
            .ok_or_else(|| StoreError::DeviceNotFound(name.to_string()))
    }

    // ========================================================================
    // Polling
    // ========================================================================

    /// Polls one device.
    pub async fn poll(&self, name: &str) -> Result<PollResult, StoreError> {
        let entry = self.entry(name).await?;
        let result = entry.orchestrator.poll().await;
        self.record(name, &result).await;
        Ok(result)
    }

    /// Polls every enabled device in parallel.
    ///
    /// Results are in device-name order. A device removed while its poll was
    /// running is dropped from the results.
    pub async fn poll_all(&self) -> Vec<(String, PollResult)> {
        let entries: Vec<Arc<DeviceEntry>> = self
            .inner
            .read()
            .await
            .devices
            .values()
            .filter(|e| e.config.enabled)
            .cloned()
            .collect();
        debug!(devices = entries.len(), "Polling all devices");

        let polls = entries.iter().map(|entry| async move {
            let result = entry.orchestrator.poll().await;
            (entry.config.name.clone(), result)
        });
        let results = join_all(polls).await;

        let mut kept = Vec::with_capacity(results.len());
        {
            let mut inner = self.inner.write().await;
            for (name, result) in results {
                if inner.devices.contains_key(&name) {
                    inner.results.insert(name.clone(), result.clone());
                    kept.push((name, result));
                }
            }
            inner.last_poll = Some(Utc::now());
        }
        self.notify_change();
        kept
    }

    async fn record(&self, name: &str, result: &PollResult) {
        {
            let mut inner = self.inner.write().await;
            if !inner.devices.contains_key(name) {
                return;
            }
            inner.results.insert(name.to_string(), result.clone());
            inner.last_poll = Some(Utc::now());
        }
        if !result.is_usable() {
            warn!(device = %name, status = %result.status.label(), "Poll not usable");
        }
        self.notify_change();
    }

    /// Sends one restart command. Never retried.
    pub async fn restart(&self, name: &str) -> Result<(), StoreError> {
        let entry = self.entry(name).await?;
        entry.orchestrator.restart().await?;
        Ok(())
    }

    /// Drops a device's session and clears its failure state.
    pub async fn reset(&self, name: &str) -> Result<(), StoreError> {
        self.entry(name).await?.orchestrator.reset().await;
        self.notify_change();
        Ok(())
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Latest result for a device.
    pub async fn last_result(&self, name: &str) -> Option<PollResult> {
        self.inner.read().await.results.get(name).cloned()
    }

    /// Latest results for every device that has one.
    pub async fn all_results(&self) -> BTreeMap<String, PollResult> {
        self.inner.read().await.results.clone()
    }

    /// Time of the last completed poll.
    pub async fn last_poll(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_poll
    }

    /// Health of a device.
    pub async fn health(&self, name: &str) -> Result<DeviceHealth, StoreError> {
        Ok(self.entry(name).await?.orchestrator.health().await)
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn notify_change(&self) {
        self.notify.send_modify(|version| *version += 1);
    }
}

impl std::fmt::Debug for DeviceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStore")
            .field("profiles", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
