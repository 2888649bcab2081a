//! Technicolor TC4400.

use gatewatch_core::{Capability, CapabilitySet};
use gatewatch_fetch::{AuthSpec, ControlRequest, Resource};

use super::key;
use crate::decode::FieldMap;
use crate::decode::info::InfoSpec;
use crate::decode::table::TableLayout;
use crate::profile::{DetectionHint, DeviceProfile};
use crate::variant::ParserVariant;

/// TC4400: HTTP Basic, rows-are-channels tables.
pub fn tc4400_profile() -> DeviceProfile {
    DeviceProfile {
        id: "technicolor_tc4400".to_string(),
        vendor: "Technicolor".to_string(),
        model: "TC4400".to_string(),
        auth: AuthSpec::Basic,
        resources: vec![Resource::page("/cmconnectionstatus.html")],
        info_resource: Some(Resource::page("/cmswinfo.html")),
        fallback_resource: None,
        hints: vec![
            DetectionHint::contains("/", "TC4400", 20),
            DetectionHint::contains("/", "Technicolor", 5),
        ],
        capabilities: CapabilitySet::from([
            Capability::DownstreamChannels,
            Capability::UpstreamChannels,
            Capability::FirmwareVersion,
            Capability::Uptime,
            Capability::Restart,
        ]),
        priority: 10,
        parser: tc4400_parser(),
        info: Some(InfoSpec::Labels {
            firmware: key("Software Version"),
            hardware: key("Hardware Version"),
            uptime: key("System Uptime"),
        }),
        login_markers: vec![],
        restart: Some(ControlRequest::Form {
            path: "/goform/Reboot".to_string(),
            fields: vec![("RebootAction".to_string(), "1".to_string())],
        }),
    }
}

fn tc4400_parser() -> ParserVariant {
    ParserVariant::Table {
        downstream: TableLayout {
            title: "Downstream Channel Status".to_string(),
            skip_rows: 1,
            fields: FieldMap {
                channel_id: 1,
                lock: Some(2),
                modulation: Some(3),
                frequency: Some(5),
                power: Some(8),
                snr: Some(7),
                corrected: Some(11),
                uncorrected: Some(12),
            },
        },
        upstream: Some(TableLayout {
            title: "Upstream Channel Status".to_string(),
            skip_rows: 1,
            fields: FieldMap {
                channel_id: 1,
                lock: Some(2),
                modulation: Some(3),
                frequency: Some(5),
                power: Some(7),
                ..FieldMap::default()
            },
        }),
    }
}
