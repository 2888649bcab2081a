//! Ubee UBC1318.

use gatewatch_core::{Capability, CapabilitySet};
use gatewatch_fetch::{AuthSpec, Resource};

use crate::decode::FieldMap;
use crate::decode::table::TableLayout;
use crate::profile::{DetectionHint, DeviceProfile};
use crate::variant::ParserVariant;

/// UBC1318: login form answered by a meta refresh.
pub fn ubc1318_profile() -> DeviceProfile {
    DeviceProfile {
        id: "ubee_ubc1318".to_string(),
        vendor: "Ubee".to_string(),
        model: "UBC1318".to_string(),
        auth: AuthSpec::Redirect {
            login_path: "/goform/login".to_string(),
            username_field: "loginUsername".to_string(),
            password_field: "loginPassword".to_string(),
            login_marker: "login".to_string(),
        },
        resources: vec![Resource::page("/htdocs/cm_info_connection.php")],
        info_resource: None,
        fallback_resource: None,
        hints: vec![
            DetectionHint::contains("/", "UBC1318", 20),
            DetectionHint::contains("/", "Ubee", 5),
        ],
        capabilities: CapabilitySet::from([Capability::DownstreamChannels, Capability::UpstreamChannels]),
        priority: 10,
        parser: ParserVariant::Table {
            downstream: TableLayout {
                title: "Downstream Channel".to_string(),
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
                title: "Upstream Channel".to_string(),
                skip_rows: 1,
                fields: FieldMap {
                    channel_id: 0,
                    lock: Some(1),
                    modulation: Some(2),
                    frequency: Some(3),
                    power: Some(4),
                    ..FieldMap::default()
                },
            }),
        },
        info: None,
        login_markers: vec!["loginUsername".to_string()],
        restart: None,
    }
}
