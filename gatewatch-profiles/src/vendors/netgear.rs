//! Netgear cable modems. Channel data lives in `tagValueList` script
//! variables rather than in the rendered tables.

use gatewatch_core::{Capability, CapabilitySet};
use gatewatch_fetch::{AuthSpec, Resource};

use super::{indexed_downstream_fields, indexed_upstream_fields, script_section};
use crate::profile::{DetectionHint, DeviceProfile};
use crate::variant::ParserVariant;

/// Shared script layout for every Netgear DOCSIS status page.
fn docsis_status_parser() -> ParserVariant {
    ParserVariant::Delimited {
        downstream: script_section("InitDsTableTagValue", 9, indexed_downstream_fields()),
        upstream: Some(script_section("InitUsTableTagValue", 7, indexed_upstream_fields())),
    }
}

fn channel_capabilities() -> CapabilitySet {
    CapabilitySet::from([Capability::DownstreamChannels, Capability::UpstreamChannels])
}

/// CM600: HTTP Basic, `.asp` status page.
pub fn cm600_profile() -> DeviceProfile {
    DeviceProfile {
        id: "netgear_cm600".to_string(),
        vendor: "Netgear".to_string(),
        model: "CM600".to_string(),
        auth: AuthSpec::Basic,
        resources: vec![Resource::page("/DocsisStatus.asp")],
        info_resource: None,
        fallback_resource: None,
        hints: vec![
            DetectionHint::contains("/", "CM600", 20),
            DetectionHint::contains("/DocsisStatus.asp", "InitDsTableTagValue", 10),
        ],
        capabilities: channel_capabilities(),
        priority: 10,
        parser: docsis_status_parser(),
        info: None,
        login_markers: vec![],
        restart: None,
    }
}

/// C7000 gateway: Genie login form with a web token nonce.
pub fn c7000_profile() -> DeviceProfile {
    DeviceProfile {
        id: "netgear_c7000".to_string(),
        vendor: "Netgear".to_string(),
        model: "C7000".to_string(),
        auth: AuthSpec::FormNonce {
            login_path: "/goform/GenieLogin".to_string(),
            username_field: "loginUsername".to_string(),
            password_field: "loginPassword".to_string(),
            nonce_field: "webToken".to_string(),
            nonce_digits: 5,
            success_marker: "DocsisStatus".to_string(),
            error_marker: "Login failed".to_string(),
            lockout_marker: Some("Too many login attempts".to_string()),
        },
        resources: vec![Resource::page("/DocsisStatus.htm")],
        info_resource: None,
        // Older firmware renders status on the index page.
        fallback_resource: Some(Resource::page("/")),
        hints: vec![
            DetectionHint::contains("/", "C7000", 20),
            DetectionHint::contains("/", "GenieLogin", 5),
        ],
        capabilities: channel_capabilities(),
        priority: 10,
        parser: docsis_status_parser(),
        info: None,
        login_markers: vec!["GenieLogin".to_string()],
        restart: None,
    }
}
