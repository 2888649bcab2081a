//! Channel records.
//!
//! A [`ChannelRecord`] is the normalized form of one row/column/record of a
//! vendor's channel table. Channel ids are only unique within one
//! (device, direction, poll) triple.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

// ============================================================================
// Direction
// ============================================================================

/// Which way a channel carries traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelDirection {
    /// Headend to modem.
    Downstream,
    /// Modem to headend.
    Upstream,
}

impl ChannelDirection {
    /// Returns a short label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Downstream => "downstream",
            Self::Upstream => "upstream",
        }
    }
}

impl fmt::Display for ChannelDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Technology
// ============================================================================

/// DOCSIS channel technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelTechnology {
    /// Single-carrier QAM (DOCSIS 3.0 downstream).
    ScQam,
    /// DOCSIS 3.1 downstream OFDM.
    Ofdm,
    /// DOCSIS 3.0 upstream.
    Atdma,
    /// DOCSIS 3.1 upstream OFDMA.
    Ofdma,
    /// Not reported or not recognised.
    #[default]
    Unknown,
}

impl ChannelTechnology {
    /// Classifies a vendor modulation/channel-type string.
    ///
    /// Vendors report things like `QAM256`, `OFDM PLC`, `SC-QAM`, `ATDMA`,
    /// `OFDMA`. Upstream SC-QAM channels are ATDMA.
    pub fn classify(raw: &str, direction: ChannelDirection) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return Self::Unknown;
        }

        match direction {
            ChannelDirection::Downstream => {
                if upper.contains("OFDM") {
                    Self::Ofdm
                } else {
                    Self::ScQam
                }
            }
            ChannelDirection::Upstream => {
                if upper.contains("OFDMA") {
                    Self::Ofdma
                } else {
                    Self::Atdma
                }
            }
        }
    }

    /// Returns the display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ScQam => "SC-QAM",
            Self::Ofdm => "OFDM",
            Self::Atdma => "ATDMA",
            Self::Ofdma => "OFDMA",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ChannelTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Lock Status
// ============================================================================

/// Whether the modem reports the channel as locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    /// Channel is locked.
    Locked,
    /// Channel is present but not locked.
    NotLocked,
    /// Lock state not reported.
    #[default]
    Unknown,
}

impl LockStatus {
    /// Parses a vendor lock string (`Locked`, `Not Locked`, `1`, `0`, ...).
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        match lower.as_str() {
            "" | "unknown" | "n/a" | "-" => Self::Unknown,
            "locked" | "lock" | "yes" | "1" | "true" | "ok" => Self::Locked,
            s if s.starts_with("not") || s.starts_with("un") || s == "0" || s == "no" => {
                Self::NotLocked
            }
            s if s.contains("locked") => Self::Locked,
            _ => Self::Unknown,
        }
    }

    /// Returns true when the channel is locked.
    pub fn is_locked(&self) -> bool {
        *self == Self::Locked
    }
}

// ============================================================================
// Channel Record
// ============================================================================

/// One decoded channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    /// Channel id as reported by the device.
    pub channel_id: u32,
    /// Downstream or upstream.
    pub direction: ChannelDirection,
    /// Channel technology.
    pub technology: ChannelTechnology,
    /// Raw modulation string, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modulation: Option<String>,
    /// Lock state.
    pub lock: LockStatus,
    /// Center frequency in Hz.
    #[serde(default)]
    pub frequency_hz: Option<u64>,
    /// Power level in dBmV.
    #[serde(default)]
    pub power_dbmv: Option<f64>,
    /// Signal-to-noise ratio in dB (downstream only).
    #[serde(default)]
    pub snr_db: Option<f64>,
    /// Corrected codewords (downstream only).
    #[serde(default)]
    pub corrected: Option<u64>,
    /// Uncorrectable codewords (downstream only).
    #[serde(default)]
    pub uncorrected: Option<u64>,
}

impl ChannelRecord {
    /// Creates a record with only the identity fields set.
    pub fn new(channel_id: u32, direction: ChannelDirection) -> Self {
        Self {
            channel_id,
            direction,
            technology: ChannelTechnology::Unknown,
            modulation: None,
            lock: LockStatus::Unknown,
            frequency_hz: None,
            power_dbmv: None,
            snr_db: None,
            corrected: None,
            uncorrected: None,
        }
    }

    /// Returns true for downstream channels.
    pub fn is_downstream(&self) -> bool {
        self.direction == ChannelDirection::Downstream
    }

    /// Checks that the record is internally consistent.
    ///
    /// Upstream channels carry no SNR or codeword counters.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.direction == ChannelDirection::Upstream
            && (self.snr_db.is_some() || self.corrected.is_some() || self.uncorrected.is_some())
        {
            return Err(CoreError::InvalidChannel(format!(
                "upstream channel {} carries downstream-only metrics",
                self.channel_id
            )));
        }

        if let Some(power) = self.power_dbmv {
            if !power.is_finite() {
                return Err(CoreError::InvalidChannel(format!(
                    "channel {} has non-finite power",
                    self.channel_id
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
