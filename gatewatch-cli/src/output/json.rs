//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use gatewatch_core::{ChannelRecord, PollResult};
use gatewatch_profiles::{DeviceProfile, DiscoveryOutcome};
use gatewatch_store::ProfileCatalog;
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one device.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceOutput<'a> {
    pub device: &'a str,
    pub profile: &'a str,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
    pub downstream: Vec<&'a ChannelRecord>,
    pub upstream: Vec<&'a ChannelRecord>,
    pub decode_errors: usize,
    pub reauthenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_capture: Option<&'a str>,
    pub polled_at: DateTime<Utc>,
}

impl<'a> DeviceOutput<'a> {
    /// Builds the output view of a result.
    pub fn new(device: &'a str, result: &'a PollResult) -> Self {
        let info = &result.system_info;
        Self {
            device,
            profile: &result.profile_id,
            status: result.status.label(),
            error: result.error.as_deref(),
            firmware_version: info.firmware_version.as_deref(),
            hardware_version: info.hardware_version.as_deref(),
            uptime_secs: info.uptime.map(|d| d.as_secs()),
            downstream: result.downstream().collect(),
            upstream: result.upstream().collect(),
            decode_errors: result.decode_error_count,
            reauthenticated: result.reauthenticated,
            raw_capture: result.raw_capture.as_deref(),
            polled_at: result.polled_at,
        }
    }
}

/// One profile in the listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOutput<'a> {
    pub id: &'a str,
    pub vendor: &'a str,
    pub model: &'a str,
    pub auth: &'static str,
    pub format: &'static str,
    pub capabilities: Vec<&'static str>,
    pub priority: i32,
    pub user: bool,
}

impl<'a> ProfileOutput<'a> {
    fn new(profile: &'a DeviceProfile, user: bool) -> Self {
        Self {
            id: &profile.id,
            vendor: &profile.vendor,
            model: &profile.model,
            auth: profile.auth.kind().display_name(),
            format: profile.parser.name(),
            capabilities: profile.capabilities.iter().map(|c| c.as_str()).collect(),
            priority: profile.priority,
            user,
        }
    }
}

/// Discovery outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryOutput<'a> {
    pub selected: &'a str,
    pub fallback: bool,
    pub duration_ms: u128,
    pub candidates: Vec<CandidateOutput<'a>>,
    pub probes: Vec<ProbeOutput<'a>>,
}

/// One ranked candidate.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateOutput<'a> {
    pub profile: &'a str,
    pub priority: i32,
    pub matched: usize,
    pub score: u32,
    pub vetoed: bool,
}

/// One probe.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutput<'a> {
    pub path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

// ============================================================================
// Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Serializes any value.
    pub fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }

    /// Formats poll results as an array.
    pub fn format_results(&self, results: &[(String, PollResult)]) -> Result<String> {
        let outputs: Vec<DeviceOutput<'_>> = results
            .iter()
            .map(|(name, result)| DeviceOutput::new(name, result))
            .collect();
        self.format(&outputs)
    }

    /// Formats the profile catalog.
    pub fn format_profiles(&self, catalog: &ProfileCatalog) -> Result<String> {
        let outputs: Vec<ProfileOutput<'_>> = catalog
            .all()
            .iter()
            .map(|p| ProfileOutput::new(p, catalog.is_user_profile(&p.id)))
            .collect();
        self.format(&outputs)
    }

    /// Formats a discovery outcome.
    pub fn format_discovery(&self, outcome: &DiscoveryOutcome) -> Result<String> {
        let output = DiscoveryOutput {
            selected: outcome.selected.id(),
            fallback: outcome.is_fallback(),
            duration_ms: outcome.duration.as_millis(),
            candidates: outcome
                .candidates
                .iter()
                .map(|c| CandidateOutput {
                    profile: &c.profile_id,
                    priority: c.priority,
                    matched: c.hints.matched,
                    score: c.hints.score,
                    vetoed: c.hints.vetoed,
                })
                .collect(),
            probes: outcome
                .probes
                .iter()
                .map(|p| ProbeOutput {
                    path: &p.path,
                    status: p.status(),
                    response_time_ms: p.response_time_ms,
                    error: p.error.as_deref(),
                })
                .collect(),
        };
        self.format(&output)
    }
}
