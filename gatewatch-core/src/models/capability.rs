//! Capability flags declared by device profiles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Something a device profile can report or do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Downstream channel table.
    DownstreamChannels,
    /// Upstream channel table.
    UpstreamChannels,
    /// Device uptime.
    Uptime,
    /// Firmware version string.
    FirmwareVersion,
    /// Remote restart command.
    Restart,
}

impl Capability {
    /// Returns all capabilities.
    pub fn all() -> &'static [Capability] {
        &[
            Self::DownstreamChannels,
            Self::UpstreamChannels,
            Self::Uptime,
            Self::FirmwareVersion,
            Self::Restart,
        ]
    }

    /// Returns the snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DownstreamChannels => "downstream_channels",
            Self::UpstreamChannels => "upstream_channels",
            Self::Uptime => "uptime",
            Self::FirmwareVersion => "firmware_version",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownCapability(s.to_string()))
    }
}

/// An ordered set of capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// Creates an empty set (raw capture only).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if the capability is present.
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Adds a capability.
    pub fn insert(&mut self, capability: Capability) -> bool {
        self.0.insert(capability)
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if the profile can decode any channel table.
    pub fn decodes_channels(&self) -> bool {
        self.contains(Capability::DownstreamChannels) || self.contains(Capability::UpstreamChannels)
    }

    /// Iterates the capabilities in order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Capability; N]> for CapabilitySet {
    fn from(caps: [Capability; N]) -> Self {
        caps.into_iter().collect()
    }
}
