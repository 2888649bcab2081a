//! Motorola MB8600 family.

use gatewatch_core::{Capability, CapabilitySet};
use gatewatch_fetch::{AuthSpec, ControlRequest, HnapDigest, Resource};
use serde_json::json;

use super::{hnap_pointer, hnap_section, indexed_downstream_fields, indexed_upstream_fields};
use crate::decode::info::InfoSpec;
use crate::profile::{DetectionHint, DeviceProfile};
use crate::variant::ParserVariant;

const DOWNSTREAM_ACTION: &str = "GetMotoStatusDownstreamChannelInfo";
const UPSTREAM_ACTION: &str = "GetMotoStatusUpstreamChannelInfo";
const SOFTWARE_ACTION: &str = "GetMotoStatusSoftware";
const CONNECTION_ACTION: &str = "GetMotoStatusConnectionInfo";

/// MB8600 and MB8611: HNAP with MD5 signatures.
pub fn mb8600_profile() -> DeviceProfile {
    DeviceProfile {
        id: "motorola_mb8600".to_string(),
        vendor: "Motorola".to_string(),
        model: "MB8600".to_string(),
        auth: AuthSpec::Hnap {
            endpoint: "/HNAP1/".to_string(),
            digest: HnapDigest::Md5,
        },
        resources: vec![Resource::hnap([DOWNSTREAM_ACTION, UPSTREAM_ACTION])],
        info_resource: Some(Resource::hnap([SOFTWARE_ACTION, CONNECTION_ACTION])),
        fallback_resource: None,
        hints: mb8600_hints(),
        capabilities: CapabilitySet::from([
            Capability::DownstreamChannels,
            Capability::UpstreamChannels,
            Capability::FirmwareVersion,
            Capability::Uptime,
            Capability::Restart,
        ]),
        priority: 10,
        parser: mb8600_parser(),
        info: Some(InfoSpec::Json {
            firmware: Some(hnap_pointer(SOFTWARE_ACTION, "StatusSoftwareSfVer")),
            hardware: Some(hnap_pointer(SOFTWARE_ACTION, "StatusSoftwareHdVer")),
            uptime: Some(hnap_pointer(CONNECTION_ACTION, "MotoConnSystemUpTime")),
        }),
        login_markers: vec![],
        restart: Some(ControlRequest::Hnap {
            action: "SetStatusSecuritySettings".to_string(),
            body: json!({ "MotoStatusSecurityAction": "1" }),
        }),
    }
}

fn mb8600_hints() -> Vec<DetectionHint> {
    vec![
        DetectionHint::regex("/", r"MB86\d{2}", 20),
        DetectionHint::contains("/", "Motorola", 5),
        // ARRIS HNAP firmware reuses the Motorola templates.
        DetectionHint::regex("/", r"\bS33\b", 1).negative(),
    ]
}

fn mb8600_parser() -> ParserVariant {
    ParserVariant::Delimited {
        downstream: hnap_section(DOWNSTREAM_ACTION, "MotoConnDownstreamChannel", indexed_downstream_fields()),
        upstream: Some(hnap_section(UPSTREAM_ACTION, "MotoConnUpstreamChannel", indexed_upstream_fields())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::HintMatcher;
    use crate::vendors::arris::s33_profile;
    use std::collections::BTreeMap;

    fn root(body: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("/".to_string(), body.to_string())])
    }

    #[test]
    fn test_asset_names_do_not_veto_mb8600() {
        let page = root(r#"<title>Motorola MB8600</title><script src="/js/app.s33f9a.js"></script>"#);
        let score = HintMatcher::new(&mb8600_profile()).evaluate(&page);
        assert!(!score.vetoed);
        assert!(score.is_match());
        assert!(!HintMatcher::new(&s33_profile()).evaluate(&page).is_match());
    }

    #[test]
    fn test_s33_model_name_vetoes_mb8600() {
        let page = root("<title>ARRIS S33 Motorola HNAP</title>");
        assert!(HintMatcher::new(&mb8600_profile()).evaluate(&page).vetoed);
        assert!(HintMatcher::new(&s33_profile()).evaluate(&page).is_match());
    }
}
