//! Fallback for devices no profile matched.

use gatewatch_core::CapabilitySet;
use gatewatch_fetch::{AuthSpec, Resource};

use crate::profile::DeviceProfile;
use crate::variant::ParserVariant;

/// Id of the raw-capture fallback profile.
pub const GENERIC_PROFILE_ID: &str = "generic";

/// Raw capture of the index page, no channel data.
pub fn generic_profile() -> DeviceProfile {
    DeviceProfile {
        id: GENERIC_PROFILE_ID.to_string(),
        vendor: "Unknown".to_string(),
        model: "Generic".to_string(),
        auth: AuthSpec::None,
        resources: vec![Resource::page("/")],
        info_resource: None,
        fallback_resource: None,
        hints: vec![],
        capabilities: CapabilitySet::empty(),
        priority: i32::MIN,
        parser: ParserVariant::RawCapture,
        info: None,
        login_markers: vec![],
        restart: None,
    }
}
