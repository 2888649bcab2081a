//! Store error types.

use gatewatch_fetch::FetchError;
use gatewatch_profiles::{PollError, ProfileError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Device not configured.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// A device with this name already exists.
    #[error("Device already configured: {0}")]
    DuplicateDevice(String),

    /// Pinned profile id is not known.
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    /// A profile file failed to parse or validate.
    #[error("Invalid profile file {path}: {reason}")]
    ProfileFile {
        /// File path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A profile is inconsistent.
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Discovery could not reach the device.
    #[error("Discovery failed: {0}")]
    Discovery(#[from] FetchError),

    /// A poll or restart failed.
    #[error(transparent)]
    Poll(#[from] PollError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Discovery(e) => e.is_transient(),
            StoreError::Io(_) => true,
            _ => false,
        }
    }
}
