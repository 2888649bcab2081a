//! Built-in profiles merged with user profile files.

use gatewatch_profiles::{DeviceProfile, DiscoveryPipeline, ProfileRegistry};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::StoreError;
use crate::persistence::load_profile_dir;

/// The set of profiles discovery and pinning choose from.
///
/// A user profile with the same id as a built-in replaces it in place.
#[derive(Debug, Clone)]
pub struct ProfileCatalog {
    profiles: Vec<Arc<DeviceProfile>>,
    user_ids: HashSet<String>,
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileCatalog {
    /// Only the built-in profiles.
    pub fn builtin() -> Self {
        Self {
            profiles: ProfileRegistry::all().to_vec(),
            user_ids: HashSet::new(),
        }
    }

    /// Built-ins with user profiles layered on top.
    pub fn with_user_profiles(user: Vec<DeviceProfile>) -> Self {
        let mut catalog = Self::builtin();
        for profile in user {
            catalog.insert(profile);
        }
        catalog
    }

    /// Built-ins plus every loadable profile file in `dir`.
    ///
    /// Broken files are skipped and returned alongside the catalog.
    pub async fn load(dir: &Path) -> Result<(Self, Vec<StoreError>), StoreError> {
        let (user, errors) = load_profile_dir(dir).await?;
        let catalog = Self::with_user_profiles(user);
        info!(
            total = catalog.len(),
            user = catalog.user_ids.len(),
            skipped = errors.len(),
            "Profile catalog loaded"
        );
        Ok((catalog, errors))
    }

    fn insert(&mut self, profile: DeviceProfile) {
        let profile = Arc::new(profile);
        self.user_ids.insert(profile.id.clone());
        match self.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(slot) => {
                info!(profile = %profile.id, "User profile overrides built-in");
                *slot = profile;
            }
            None => self.profiles.push(profile),
        }
    }

    /// Every profile.
    pub fn all(&self) -> &[Arc<DeviceProfile>] {
        &self.profiles
    }

    /// Gets a profile by id.
    pub fn get(&self, id: &str) -> Option<Arc<DeviceProfile>> {
        self.profiles.iter().find(|p| p.id == id).cloned()
    }

    /// Returns true if the profile came from a user file.
    pub fn is_user_profile(&self, id: &str) -> bool {
        self.user_ids.contains(id)
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns true if there are no profiles.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Discovery pipeline over this catalog.
    pub fn discovery(&self) -> DiscoveryPipeline {
        DiscoveryPipeline::new(self.profiles.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_profile(id: &str) -> DeviceProfile {
        let mut profile = (*ProfileRegistry::get("arris_sb8200").unwrap()).clone();
        profile.id = id.to_string();
        profile.model = "Custom".to_string();
        profile
    }

    #[test]
    fn test_user_profile_overrides_builtin() {
        let catalog = ProfileCatalog::with_user_profiles(vec![user_profile("arris_sb8200")]);
        assert_eq!(catalog.len(), ProfileRegistry::count());
        assert_eq!(catalog.get("arris_sb8200").unwrap().model, "Custom");
        assert!(catalog.is_user_profile("arris_sb8200"));
        assert!(!catalog.is_user_profile("arris_sb6141"));
    }

    #[test]
    fn test_new_user_profile_is_added() {
        let catalog = ProfileCatalog::with_user_profiles(vec![user_profile("acme_cm1")]);
        assert_eq!(catalog.len(), ProfileRegistry::count() + 1);
        assert!(catalog.get("acme_cm1").is_some());
    }

    #[test]
    fn test_discovery_excludes_generic() {
        let pipeline = ProfileCatalog::builtin().discovery();
        assert_eq!(pipeline.len(), ProfileRegistry::count() - 1);
    }
}
