//! ARRIS SURFboard profiles.

use gatewatch_core::{Capability, CapabilitySet};
use gatewatch_fetch::{AuthSpec, ControlRequest, HnapDigest, Resource};
use serde_json::json;

use super::{hnap_pointer, hnap_section, indexed_downstream_fields, indexed_upstream_fields, key};
use crate::decode::FieldMap;
use crate::decode::info::InfoSpec;
use crate::decode::table::{TableLayout, TransposedLayout};
use crate::profile::{DetectionHint, DeviceProfile};
use crate::variant::ParserVariant;

// ============================================================================
// SB6141
// ============================================================================

/// SB6141: DOCSIS 3.0, no login, transposed signal tables.
pub fn sb6141_profile() -> DeviceProfile {
    DeviceProfile {
        id: "arris_sb6141".to_string(),
        vendor: "ARRIS".to_string(),
        model: "SB6141".to_string(),
        auth: AuthSpec::None,
        resources: vec![Resource::page("/cmSignalData.htm")],
        info_resource: Some(Resource::page("/indexData.htm")),
        fallback_resource: None,
        hints: vec![
            DetectionHint::contains("/cmSignalData.htm", "Signal Stats (Codewords)", 10),
            DetectionHint::contains("/", "SB6141", 20),
        ],
        capabilities: CapabilitySet::from([
            Capability::DownstreamChannels,
            Capability::UpstreamChannels,
            Capability::Uptime,
        ]),
        priority: 10,
        parser: sb6141_parser(),
        info: Some(InfoSpec::Labels {
            firmware: None,
            hardware: None,
            uptime: key("System Up Time"),
        }),
        login_markers: vec![],
        restart: None,
    }
}

fn sb6141_parser() -> ParserVariant {
    ParserVariant::Transposed {
        downstream: TransposedLayout {
            titles: vec!["Downstream".to_string(), "Signal Stats (Codewords)".to_string()],
            rows: FieldMap {
                channel_id: "Channel ID".to_string(),
                lock: None,
                modulation: key("Downstream Modulation"),
                frequency: key("Frequency"),
                power: key("Power Level"),
                snr: key("Signal to Noise Ratio"),
                corrected: key("Total Correctable Codewords"),
                uncorrected: key("Total Uncorrectable Codewords"),
            },
        },
        upstream: Some(TransposedLayout {
            titles: vec!["Upstream".to_string()],
            rows: FieldMap {
                channel_id: "Channel ID".to_string(),
                modulation: key("Upstream Modulation"),
                frequency: key("Frequency"),
                power: key("Power Level"),
                ..FieldMap::default()
            },
        }),
    }
}

// ============================================================================
// SB8200
// ============================================================================

/// SB8200 on firmware without a login page.
pub fn sb8200_profile() -> DeviceProfile {
    DeviceProfile {
        id: "arris_sb8200".to_string(),
        vendor: "ARRIS".to_string(),
        model: "SB8200".to_string(),
        auth: AuthSpec::None,
        resources: vec![Resource::page("/cmconnectionstatus.html")],
        info_resource: Some(Resource::page("/cmswinfo.html")),
        fallback_resource: None,
        hints: vec![
            DetectionHint::contains("/", "SB8200", 20),
            DetectionHint::contains("/cmconnectionstatus.html", "Downstream Bonded Channels", 5),
            // Token firmware serves a login script on every page.
            DetectionHint::contains("/", "login_", 1).negative(),
        ],
        capabilities: sb8200_capabilities(),
        priority: 10,
        parser: sb8200_parser(),
        info: Some(sb8200_info()),
        login_markers: vec![],
        restart: None,
    }
}

/// SB8200 on firmware that puts base64 credentials in the URL.
pub fn sb8200_token_profile() -> DeviceProfile {
    DeviceProfile {
        id: "arris_sb8200_token".to_string(),
        vendor: "ARRIS".to_string(),
        model: "SB8200 (URL token firmware)".to_string(),
        auth: AuthSpec::UrlToken {
            login_path: "/cmconnectionstatus.html".to_string(),
        },
        resources: vec![Resource::page("/cmconnectionstatus.html")],
        info_resource: Some(Resource::page("/cmswinfo.html")),
        fallback_resource: None,
        // The model name and the login script must both be present.
        hints: vec![DetectionHint::regex("/", r"(?s)SB8200.*login_|login_.*SB8200", 30)],
        capabilities: sb8200_capabilities(),
        priority: 10,
        parser: sb8200_parser(),
        info: Some(sb8200_info()),
        login_markers: vec!["credential".to_string()],
        restart: None,
    }
}

fn sb8200_capabilities() -> CapabilitySet {
    CapabilitySet::from([
        Capability::DownstreamChannels,
        Capability::UpstreamChannels,
        Capability::FirmwareVersion,
        Capability::Uptime,
    ])
}

fn sb8200_parser() -> ParserVariant {
    ParserVariant::Table {
        downstream: TableLayout {
            title: "Downstream Bonded Channels".to_string(),
            skip_rows: 1,
            fields: FieldMap {
                channel_id: 0,
                lock: Some(1),
                modulation: Some(2),
                frequency: Some(3),
                power: Some(4),
                snr: Some(5),
                corrected: Some(6),
                uncorrected: Some(7),
            },
        },
        upstream: Some(TableLayout {
            title: "Upstream Bonded Channels".to_string(),
            skip_rows: 1,
            fields: FieldMap {
                channel_id: 1,
                lock: Some(2),
                modulation: Some(3),
                frequency: Some(4),
                power: Some(6),
                ..FieldMap::default()
            },
        }),
    }
}

fn sb8200_info() -> InfoSpec {
    InfoSpec::Labels {
        firmware: key("Software Version"),
        hardware: key("Hardware Version"),
        uptime: key("Up Time"),
    }
}

// ============================================================================
// S33
// ============================================================================

const S33_DOWNSTREAM: &str = "GetCustomerStatusDownstreamChannelInfo";
const S33_UPSTREAM: &str = "GetCustomerStatusUpstreamChannelInfo";
const S33_SOFTWARE: &str = "GetCustomerStatusSoftware";
const S33_CONNECTION: &str = "GetCustomerStatusConnectionInfo";

/// S33: DOCSIS 3.1, HNAP with SHA-256 signatures.
pub fn s33_profile() -> DeviceProfile {
    DeviceProfile {
        id: "arris_s33".to_string(),
        vendor: "ARRIS".to_string(),
        model: "S33".to_string(),
        auth: AuthSpec::Hnap {
            endpoint: "/HNAP1/".to_string(),
            digest: HnapDigest::Sha256,
        },
        resources: vec![Resource::hnap([S33_DOWNSTREAM, S33_UPSTREAM])],
        info_resource: Some(Resource::hnap([S33_SOFTWARE, S33_CONNECTION])),
        fallback_resource: None,
        hints: vec![
            DetectionHint::regex("/", r"\bS33\b", 20),
            DetectionHint::contains("/", "HNAP", 5),
        ],
        capabilities: CapabilitySet::from([
            Capability::DownstreamChannels,
            Capability::UpstreamChannels,
            Capability::FirmwareVersion,
            Capability::Uptime,
            Capability::Restart,
        ]),
        priority: 10,
        parser: ParserVariant::Delimited {
            downstream: hnap_section(S33_DOWNSTREAM, "CustomerConnDownstreamChannel", indexed_downstream_fields()),
            upstream: Some(hnap_section(S33_UPSTREAM, "CustomerConnUpstreamChannel", indexed_upstream_fields())),
        },
        info: Some(InfoSpec::Json {
            firmware: Some(hnap_pointer(S33_SOFTWARE, "StatusSoftwareSfVer")),
            hardware: Some(hnap_pointer(S33_SOFTWARE, "StatusSoftwareHdVer")),
            uptime: Some(hnap_pointer(S33_CONNECTION, "CustomerConnSystemUpTime")),
        }),
        login_markers: vec![],
        restart: Some(ControlRequest::Hnap {
            action: "SetStatusSecuritySettings".to_string(),
            body: json!({ "MotoStatusSecurityAction": "1" }),
        }),
    }
}
