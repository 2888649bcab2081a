//! Built-in profile registry.
//!
//! The registry gives static access to every built-in profile. User
//! profiles are layered on top by the store crate.

use std::sync::{Arc, OnceLock};

use crate::profile::DeviceProfile;
use crate::vendors::arris::{s33_profile, sb6141_profile, sb8200_profile, sb8200_token_profile};
use crate::vendors::generic::generic_profile;
use crate::vendors::hitron::coda56_profile;
use crate::vendors::motorola::mb8600_profile;
use crate::vendors::netgear::{c7000_profile, cm600_profile};
use crate::vendors::technicolor::tc4400_profile;
use crate::vendors::ubee::ubc1318_profile;

// ============================================================================
// Static Registry
// ============================================================================

/// Static storage for all built-in profiles.
static PROFILES: OnceLock<Vec<Arc<DeviceProfile>>> = OnceLock::new();

/// Initializes all built-in profiles.
///
/// The generic raw-capture profile is always last.
fn init_profiles() -> Vec<Arc<DeviceProfile>> {
    vec![
        // ARRIS
        sb6141_profile(),
        sb8200_profile(),
        sb8200_token_profile(),
        s33_profile(),
        // Motorola
        mb8600_profile(),
        // Netgear
        cm600_profile(),
        c7000_profile(),
        // Others
        tc4400_profile(),
        coda56_profile(),
        ubc1318_profile(),
        // Fallback
        generic_profile(),
    ]
    .into_iter()
    .map(Arc::new)
    .collect()
}

// ============================================================================
// Profile Registry
// ============================================================================

/// Global registry of built-in device profiles.
pub struct ProfileRegistry;

impl ProfileRegistry {
    /// Returns all built-in profiles, generic last.
    pub fn all() -> &'static [Arc<DeviceProfile>] {
        PROFILES.get_or_init(init_profiles)
    }

    /// Gets a profile by id.
    pub fn get(id: &str) -> Option<Arc<DeviceProfile>> {
        Self::all().iter().find(|p| p.id == id).cloned()
    }

    /// Returns the raw-capture fallback profile.
    pub fn generic() -> Arc<DeviceProfile> {
        Self::all()
            .iter()
            .find(|p| p.is_generic())
            .cloned()
            .unwrap_or_else(|| Arc::new(generic_profile()))
    }

    /// Returns the number of built-in profiles.
    pub fn count() -> usize {
        Self::all().len()
    }

    /// Returns all profile ids.
    pub fn ids() -> Vec<&'static str> {
        Self::all().iter().map(|p| p.id.as_str()).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
