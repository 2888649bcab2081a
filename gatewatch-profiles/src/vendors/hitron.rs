//! Hitron CODA-56.

use gatewatch_core::{Capability, CapabilitySet};
use gatewatch_fetch::{AuthSpec, Resource};

use super::key;
use crate::decode::FieldMap;
use crate::decode::info::InfoSpec;
use crate::decode::structured::StructuredLayout;
use crate::profile::{DetectionHint, DeviceProfile};
use crate::variant::ParserVariant;

/// CODA-56: form login, JSON data endpoints.
pub fn coda56_profile() -> DeviceProfile {
    DeviceProfile {
        id: "hitron_coda56".to_string(),
        vendor: "Hitron".to_string(),
        model: "CODA-56".to_string(),
        auth: AuthSpec::Form {
            login_path: "/goform/login".to_string(),
            username_field: "usr".to_string(),
            password_field: "pwd".to_string(),
            extra_fields: vec![("forcelogoff".to_string(), "1".to_string())],
            success_marker: None,
            error_marker: Some("Login failed".to_string()),
            session_cookie: Some("userid".to_string()),
        },
        resources: vec![Resource::page("/data/dsinfo.asp")],
        info_resource: Some(Resource::page("/data/getSysInfo.asp")),
        fallback_resource: None,
        hints: vec![
            DetectionHint::contains("/", "CODA-56", 20),
            DetectionHint::contains("/", "Hitron", 5),
        ],
        capabilities: CapabilitySet::from([
            Capability::DownstreamChannels,
            Capability::FirmwareVersion,
            Capability::Uptime,
        ]),
        priority: 10,
        parser: ParserVariant::Structured {
            downstream: StructuredLayout {
                pointer: "/Freq_List".to_string(),
                keys: FieldMap {
                    channel_id: "channelId".to_string(),
                    lock: None,
                    modulation: key("modulation"),
                    frequency: key("frequency"),
                    power: key("signalStrength"),
                    snr: key("snr"),
                    corrected: key("correcteds"),
                    uncorrected: key("uncorrect"),
                },
            },
            upstream: None,
        },
        info: Some(InfoSpec::Json {
            firmware: key("/0/swVersion"),
            hardware: key("/0/hwVersion"),
            uptime: key("/0/systemUptime"),
        }),
        login_markers: vec![],
        restart: None,
    }
}
