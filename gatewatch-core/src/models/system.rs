//! Device system information.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Firmware, hardware and uptime as reported by the device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Firmware/software version string.
    #[serde(default)]
    pub firmware_version: Option<String>,
    /// Hardware version string.
    #[serde(default)]
    pub hardware_version: Option<String>,
    /// Time since the device last booted.
    #[serde(default, with = "duration_secs")]
    pub uptime: Option<Duration>,
}

impl SystemInfo {
    /// Returns true if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.firmware_version.is_none() && self.hardware_version.is_none() && self.uptime.is_none()
    }

    /// Fills fields that are missing here from `other`.
    pub fn merge(&mut self, other: SystemInfo) {
        if self.firmware_version.is_none() {
            self.firmware_version = other.firmware_version;
        }
        if self.hardware_version.is_none() {
            self.hardware_version = other.hardware_version;
        }
        if self.uptime.is_none() {
            self.uptime = other.uptime;
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_existing() {
        let mut info = SystemInfo {
            firmware_version: Some("8600-18.2.12".to_string()),
            ..Default::default()
        };
        info.merge(SystemInfo {
            firmware_version: Some("other".to_string()),
            uptime: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        assert_eq!(info.firmware_version.as_deref(), Some("8600-18.2.12"));
        assert_eq!(info.uptime, Some(Duration::from_secs(60)));
    }
}
