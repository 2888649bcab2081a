//! Decode, capability and poll error types.

use chrono::{DateTime, Utc};
use gatewatch_core::Capability;
use gatewatch_fetch::{AuthError, FetchError};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Parse Error
// ============================================================================

/// Why a session was judged stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleCause {
    /// The device served its login page instead of data.
    LoginPage,
    /// A data page decoded to zero channels.
    EmptyDecode,
}

impl fmt::Display for StaleCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginPage => f.write_str("device served its login page"),
            Self::EmptyDecode => f.write_str("data page decoded to zero channels"),
        }
    }
}

/// Error type for decoding device payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The expected structure is not in the payload at all.
    #[error("No match: {0}")]
    NoMatch(String),

    /// Some records were skipped.
    #[error("Partial decode: {decoded} records decoded, {skipped} skipped")]
    PartialDecode {
        /// Records decoded.
        decoded: usize,
        /// Records skipped as malformed.
        skipped: usize,
    },

    /// The session no longer yields data.
    #[error("Stale session: {cause}")]
    StaleSession {
        /// What gave it away.
        cause: StaleCause,
    },
}

// ============================================================================
// Capability Error
// ============================================================================

/// Error type for operations a profile does not support.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// The profile does not declare the capability.
    #[error("Profile {profile} does not support {capability}")]
    Unsupported {
        /// Profile id.
        profile: String,
        /// Missing capability.
        capability: Capability,
    },
}

// ============================================================================
// Profile Error
// ============================================================================

/// Error type for invalid profile definitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid profile {id}: {reason}")]
pub struct ProfileError {
    /// Profile id.
    pub id: String,
    /// What is wrong with it.
    pub reason: String,
}

// ============================================================================
// Poll Error
// ============================================================================

/// Umbrella error for one polling cycle.
#[derive(Debug, Error)]
pub enum PollError {
    /// Authentication failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A request failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Decoding failed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Operation not supported by the profile.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// The device locked us out; nothing is sent until the cooldown ends.
    #[error("Locked out until {until}")]
    LockedOut {
        /// End of the cooldown.
        until: DateTime<Utc>,
    },

    /// The device answered a control command but did not carry it out.
    #[error("Command rejected: {0}")]
    CommandRejected(String),

    /// Too many consecutive authentication failures.
    #[error("Authentication disabled after {failures} consecutive failures; reset required")]
    AuthDisabled {
        /// Consecutive failures.
        failures: u32,
    },
}

impl PollError {
    /// Returns true if this is a stale-session outcome.
    pub fn is_stale_session(&self) -> bool {
        matches!(self, Self::Parse(ParseError::StaleSession { .. }))
    }
}
