// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # Gatewatch Store
//!
//! Configuration and device state for gatewatch.
//!
//! This crate provides:
//!
//! - **Config**: Devices and polling settings, persisted as JSON
//! - **ProfileCatalog**: Built-in profiles merged with user profile files
//! - **DeviceStore**: One orchestrator per device, latest results and change notifications
//! - **Persistence**: File I/O helpers with owner-only permissions
//!
//! ## Usage
//!
//! ```ignore
//! use gatewatch_store::{Config, DeviceStore, ProfileCatalog};
//!
//! let config = Config::load()?;
//! let (catalog, _skipped) = ProfileCatalog::load(&default_profiles_dir()).await?;
//! let store = DeviceStore::new(Arc::new(config.general.fetch_context()?), catalog);
//!
//! for device in config.enabled_devices() {
//!     store.add_device(device.clone()).await?;
//! }
//!
//! // Subscribe to changes
//! let mut rx = store.subscribe();
//! store.poll_all().await;
//! while rx.changed().await.is_ok() {
//!     println!("Results updated!");
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod device_store;
pub mod error;
pub mod persistence;

pub use catalog::ProfileCatalog;
pub use config::{Config, DeviceConfig, GeneralConfig};
pub use device_store::{DeviceEntry, DeviceStore};
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_profiles_dir, ensure_dir, load_json, load_profile_dir, load_profile_file,
    profiles_dir_for, save_json,
};
