//! Device profiles.
//!
//! A [`DeviceProfile`] is everything needed to talk to one family of
//! devices: how to log in, what to fetch, how to recognise the device and how
//! to decode its pages. Profiles are plain data (built in, or loaded from
//! YAML/JSON files) and are never mutated once loaded.

use gatewatch_core::{Capability, CapabilitySet};
use gatewatch_fetch::{AuthKind, AuthSpec, ControlRequest, Resource};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::decode::info::InfoSpec;
use crate::error::ProfileError;
use crate::variant::ParserVariant;

// ============================================================================
// Detection Hints
// ============================================================================

/// What a hint looks for in a probed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum HintPattern {
    /// Case-insensitive substring.
    Contains {
        /// Text to find.
        text: String,
    },
    /// Regular expression.
    Regex {
        /// Pattern source.
        pattern: String,
    },
}

/// One piece of evidence that a page belongs to a profile.
///
/// Negative hints veto a profile outright; they tell apart vendors that
/// share a web template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionHint {
    /// Path to probe.
    #[serde(default = "default_hint_path")]
    pub path: String,
    /// Pattern to look for.
    #[serde(flatten)]
    pub pattern: HintPattern,
    /// Veto instead of support.
    #[serde(default)]
    pub negative: bool,
    /// Weight of a match.
    pub priority: u32,
}

fn default_hint_path() -> String {
    "/".to_string()
}

impl DetectionHint {
    /// Substring hint.
    pub fn contains(path: impl Into<String>, text: impl Into<String>, priority: u32) -> Self {
        Self {
            path: path.into(),
            pattern: HintPattern::Contains { text: text.into() },
            negative: false,
            priority,
        }
    }

    /// Regex hint.
    pub fn regex(path: impl Into<String>, pattern: impl Into<String>, priority: u32) -> Self {
        Self {
            path: path.into(),
            pattern: HintPattern::Regex {
                pattern: pattern.into(),
            },
            negative: false,
            priority,
        }
    }

    /// Turns this hint into a veto.
    #[must_use]
    pub fn negative(mut self) -> Self {
        self.negative = true;
        self
    }
}

// ============================================================================
// Device Profile
// ============================================================================

/// Static description of a device family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Unique identifier (`arris_sb8200`).
    pub id: String,
    /// Vendor name.
    pub vendor: String,
    /// Model name.
    pub model: String,
    /// Login mechanism and parameters.
    #[serde(default)]
    pub auth: AuthSpec,
    /// Data resources, tried in order; the first that decodes wins.
    pub resources: Vec<Resource>,
    /// Fetched after channel data for system information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_resource: Option<Resource>,
    /// Generic resource tried only after every declared one failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_resource: Option<Resource>,
    /// Detection hints.
    #[serde(default)]
    pub hints: Vec<DetectionHint>,
    /// Declared capabilities.
    #[serde(default)]
    pub capabilities: CapabilitySet,
    /// Tie-break between matching profiles; higher wins.
    #[serde(default)]
    pub priority: i32,
    /// Data page decoder.
    pub parser: ParserVariant,
    /// System information decoder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<InfoSpec>,
    /// Extra text that marks the device's login page.
    #[serde(default)]
    pub login_markers: Vec<String>,
    /// Restart command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<ControlRequest>,
}

impl DeviceProfile {
    /// Returns `"Vendor Model"`.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.vendor, self.model)
    }

    /// Returns true if the profile declares a capability.
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Returns true for the raw-capture fallback.
    pub fn is_generic(&self) -> bool {
        self.parser.is_raw_capture()
    }

    /// Distinct hint paths, in declaration order.
    pub fn hint_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::new();
        for hint in &self.hints {
            if !paths.contains(&hint.path.as_str()) {
                paths.push(&hint.path);
            }
        }
        paths
    }

    /// Checks that the profile is internally consistent.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let fail = |reason: String| {
            Err(ProfileError {
                id: self.id.clone(),
                reason,
            })
        };

        if self.id.trim().is_empty() {
            return fail("empty id".to_string());
        }
        if self.resources.is_empty() {
            return fail("no resources".to_string());
        }

        let hnap_auth = self.auth.kind() == AuthKind::Hnap;
        let all_resources = self
            .resources
            .iter()
            .chain(self.info_resource.iter())
            .chain(self.fallback_resource.iter());
        for resource in all_resources {
            if matches!(resource, Resource::Hnap { .. }) && !hnap_auth {
                return fail(format!("{} requires HNAP authentication", resource.label()));
            }
        }

        let decodable = self.parser.capabilities();
        for capability in [Capability::DownstreamChannels, Capability::UpstreamChannels] {
            if self.supports(capability) && !decodable.contains(capability) {
                return fail(format!("declares {capability} but its parser cannot decode it"));
            }
        }
        for capability in [Capability::Uptime, Capability::FirmwareVersion] {
            if self.supports(capability) && self.info.is_none() {
                return fail(format!("declares {capability} without an info decoder"));
            }
        }
        if self.supports(Capability::Restart) && self.restart.is_none() {
            return fail("declares restart without a restart command".to_string());
        }

        if let ParserVariant::Delimited { downstream, upstream } = &self.parser {
            for section in std::iter::once(downstream).chain(upstream.iter()) {
                if let Err(reason) = section.layout.check() {
                    return fail(format!("delimited layout: {reason}"));
                }
            }
        }

        for hint in &self.hints {
            if let HintPattern::Regex { pattern } = &hint.pattern {
                if let Err(e) = Regex::new(pattern) {
                    return fail(format!("invalid hint pattern {pattern:?}: {e}"));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> DeviceProfile {
        DeviceProfile {
            id: "test".to_string(),
            vendor: "Test".to_string(),
            model: "T1".to_string(),
            auth: AuthSpec::None,
            resources: vec![Resource::page("/")],
            info_resource: None,
            fallback_resource: None,
            hints: vec![],
            capabilities: CapabilitySet::default(),
            priority: 0,
            parser: ParserVariant::RawCapture,
            info: None,
            login_markers: vec![],
            restart: None,
        }
    }

    #[test]
    fn test_minimal_profile_is_valid() {
        assert!(minimal().validate().is_ok());
        assert_eq!(minimal().display_name(), "Test T1");
        assert!(minimal().is_generic());
    }

    #[test]
    fn test_capability_without_parser_is_invalid() {
        let mut profile = minimal();
        profile.capabilities = CapabilitySet::from([Capability::DownstreamChannels]);
        let err = profile.validate().unwrap_err();
        assert!(err.reason.contains("downstream_channels"));
    }

    #[test]
    fn test_restart_requires_command() {
        let mut profile = minimal();
        profile.capabilities = CapabilitySet::from([Capability::Restart]);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_hnap_resource_requires_hnap_auth() {
        let mut profile = minimal();
        profile.resources = vec![Resource::hnap(["GetMotoStatusDownstreamChannelInfo"])];
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_implausible_delimited_width_is_invalid() {
        use crate::decode::delimited::{DelimitedLayout, DelimitedSection, PayloadSource, RecordSplit};
        use crate::decode::FieldMap;

        let section = |fields_per_record| DelimitedSection {
            source: PayloadSource::Body,
            layout: DelimitedLayout {
                field_separator: "|".to_string(),
                records: RecordSplit::Counted { fields_per_record },
                fields: FieldMap {
                    channel_id: 0,
                    lock: None,
                    modulation: None,
                    frequency: None,
                    power: None,
                    snr: None,
                    corrected: None,
                    uncorrected: None,
                },
            },
        };

        let mut profile = minimal();
        profile.parser = ParserVariant::Delimited {
            downstream: section(9),
            upstream: Some(section(usize::MAX)),
        };
        let err = profile.validate().unwrap_err();
        assert!(err.reason.contains("implausible record width"));

        profile.parser = ParserVariant::Delimited {
            downstream: section(9),
            upstream: None,
        };
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_invalid_hint_regex() {
        let mut profile = minimal();
        profile.hints = vec![DetectionHint::regex("/", "([", 1)];
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_hint_paths_are_distinct() {
        let mut profile = minimal();
        profile.hints = vec![
            DetectionHint::contains("/", "a", 1),
            DetectionHint::contains("/status.html", "b", 1),
            DetectionHint::contains("/", "c", 1).negative(),
        ];
        assert_eq!(profile.hint_paths(), vec!["/", "/status.html"]);
    }

    #[test]
    fn test_hint_yaml_shape() {
        let yaml = "path: /cmSignalData.htm\nmatch: contains\ntext: Signal Stats\npriority: 10\n";
        let hint: DetectionHint = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(hint, DetectionHint::contains("/cmSignalData.htm", "Signal Stats", 10));
    }
}
