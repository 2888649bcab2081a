//! Fetch and authentication error types.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Fetch Error
// ============================================================================

/// Error type for transport-level operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS or protocol failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded the transport timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The device answered with an error status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// A resource path could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The strategy cannot issue this kind of request.
    #[error("Unsupported request: {0}")]
    Unsupported(String),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FetchError {
    /// Returns true if a retry might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns the HTTP status, if this is a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// Auth Error
// ============================================================================

/// Error type for authentication strategies.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The device rejected the username/password.
    #[error("Wrong credentials: {0}")]
    WrongCredentials(String),

    /// The device imposed a cooldown after repeated failures.
    #[error("Locked out by device for {cooldown:?}")]
    Lockout {
        /// How long the device asked us to wait.
        cooldown: Duration,
    },

    /// The login exchange timed out.
    #[error("Authentication timed out")]
    Timeout,

    /// The challenge phase returned something unusable.
    #[error("Malformed challenge: {0}")]
    MalformedChallenge(String),

    /// The login response matched neither the success nor the error marker.
    #[error("Malformed login response: {0}")]
    MalformedResponse(String),

    /// Transport failure while logging in.
    #[error("Transport error during login: {0}")]
    Transport(String),
}

impl AuthError {
    /// Returns true for a device-imposed lockout.
    pub fn is_lockout(&self) -> bool {
        matches!(self, Self::Lockout { .. })
    }

    /// Returns the lockout cooldown, if any.
    pub fn cooldown(&self) -> Option<Duration> {
        match self {
            Self::Lockout { cooldown } => Some(*cooldown),
            _ => None,
        }
    }
}

impl From<FetchError> for AuthError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout(_) => AuthError::Timeout,
            other => AuthError::Transport(other.to_string()),
        }
    }
}
