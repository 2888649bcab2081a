//! Core error types for gatewatch.

use thiserror::Error;

/// Core error type for model-level operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A capability name that no profile understands.
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    /// A channel record failed validation.
    #[error("Invalid channel: {0}")]
    InvalidChannel(String),
}
