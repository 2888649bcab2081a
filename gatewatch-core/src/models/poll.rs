//! Poll cycle output.
//!
//! A [`PollResult`] is produced exactly once per polling cycle and handed to
//! whatever layer exposes the values (entities, CLI output, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::channel::{ChannelDirection, ChannelRecord};
use super::system::SystemInfo;

// ============================================================================
// Poll Status
// ============================================================================

/// Overall status tag of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    /// Data decoded cleanly.
    Ok,
    /// Some data decoded, but records were skipped or secondary pages failed.
    Degraded,
    /// The device served its login page (or an empty data page) even after
    /// the one permitted re-authentication.
    StaleSession,
    /// No usable data this cycle.
    Failed,
}

impl PollStatus {
    /// Returns true if the cycle produced usable data.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Ok | Self::Degraded)
    }

    /// Returns a short label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Degraded => "degraded",
            Self::StaleSession => "stale-session",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Poll Result
// ============================================================================

/// Aggregate output of one polling cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResult {
    /// Profile that decoded this result.
    pub profile_id: String,
    /// All decoded channels, downstream first.
    pub channels: Vec<ChannelRecord>,
    /// System information.
    pub system_info: SystemInfo,
    /// Records that were present but could not be decoded.
    pub decode_error_count: usize,
    /// Overall status.
    pub status: PollStatus,
    /// Human-readable failure reason, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether this cycle had to re-authenticate.
    #[serde(default)]
    pub reauthenticated: bool,
    /// Raw body for profiles without a decoder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_capture: Option<String>,
    /// When the cycle finished.
    pub polled_at: DateTime<Utc>,
}

impl PollResult {
    /// Creates an empty result with the given status.
    pub fn new(profile_id: impl Into<String>, status: PollStatus) -> Self {
        Self {
            profile_id: profile_id.into(),
            channels: Vec::new(),
            system_info: SystemInfo::default(),
            decode_error_count: 0,
            status,
            error: None,
            reauthenticated: false,
            raw_capture: None,
            polled_at: Utc::now(),
        }
    }

    /// Creates a failed result carrying the error message.
    pub fn failed(profile_id: impl Into<String>, status: PollStatus, error: impl Into<String>) -> Self {
        let mut result = Self::new(profile_id, status);
        result.error = Some(error.into());
        result
    }

    /// Iterates downstream channels.
    pub fn downstream(&self) -> impl Iterator<Item = &ChannelRecord> {
        self.channels
            .iter()
            .filter(|c| c.direction == ChannelDirection::Downstream)
    }

    /// Iterates upstream channels.
    pub fn upstream(&self) -> impl Iterator<Item = &ChannelRecord> {
        self.channels
            .iter()
            .filter(|c| c.direction == ChannelDirection::Upstream)
    }

    /// Number of downstream channels.
    pub fn downstream_count(&self) -> usize {
        self.downstream().count()
    }

    /// Number of upstream channels.
    pub fn upstream_count(&self) -> usize {
        self.upstream().count()
    }

    /// Sum of uncorrectable codewords over all downstream channels.
    pub fn total_uncorrected(&self) -> u64 {
        self.downstream().filter_map(|c| c.uncorrected).sum()
    }

    /// Returns true if the cycle produced usable data.
    pub fn is_usable(&self) -> bool {
        self.status.is_usable()
    }
}
