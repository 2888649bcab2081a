//! File persistence helpers.
//!
//! The configuration file holds device passwords, so everything written
//! here is owner-only on Unix.

use gatewatch_profiles::DeviceProfile;
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - Linux: `~/.config/gatewatch`
/// - macOS: `~/Library/Application Support/gatewatch`
/// - Windows: `%APPDATA%\gatewatch`
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join("gatewatch"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the directory user profile files are read from.
pub fn default_profiles_dir() -> PathBuf {
    default_config_dir().join("profiles")
}

/// Profile directory belonging to a config file.
pub fn profiles_dir_for(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map_or_else(default_profiles_dir, |dir| dir.join("profiles"))
}

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Sets owner-only file permissions (0o600) on Unix systems.
#[cfg(unix)]
async fn set_restrictive_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Sets owner-only directory permissions (0o700) on Unix systems.
#[cfg(unix)]
async fn set_restrictive_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o700);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_restrictive_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(not(unix))]
async fn set_restrictive_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// JSON Files
// ============================================================================

/// Ensures a directory exists; newly created ones are owner-only.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if !path.exists() {
        debug!(path = %path.display(), "Creating directory");
        tokio::fs::create_dir_all(path).await?;
        set_restrictive_dir_permissions(path).await?;
    }
    Ok(())
}

/// Saves data as pretty JSON.
///
/// Writes to a temp file and renames it into place, then restricts
/// permissions.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");

    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }

    let json = serde_json::to_string_pretty(data)?;
    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, &json).await?;
    tokio::fs::rename(&temp_path, path).await?;
    set_restrictive_permissions(path).await?;

    Ok(())
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

// ============================================================================
// Profile Files
// ============================================================================

/// Reads one profile file, choosing the format by extension.
///
/// The profile is validated before it is returned.
pub async fn load_profile_file(path: &Path) -> Result<DeviceProfile, StoreError> {
    let file_error = |reason: String| StoreError::ProfileFile {
        path: path.to_path_buf(),
        reason,
    };

    let content = tokio::fs::read_to_string(path).await?;
    let profile: DeviceProfile = match extension(path).as_deref() {
        Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(|e| file_error(e.to_string()))?,
        Some("json") => serde_json::from_str(&content).map_err(|e| file_error(e.to_string()))?,
        _ => return Err(file_error("expected a .yaml, .yml or .json file".to_string())),
    };

    profile.validate().map_err(|e| file_error(e.to_string()))?;
    Ok(profile)
}

/// Reads every profile file in a directory, sorted by file name.
///
/// A missing directory yields nothing. Files that fail to load are logged
/// and returned separately so one broken file never hides the rest.
pub async fn load_profile_dir(dir: &Path) -> Result<(Vec<DeviceProfile>, Vec<StoreError>), StoreError> {
    if !dir.exists() {
        return Ok((Vec::new(), Vec::new()));
    }

    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_profile_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut profiles = Vec::new();
    let mut errors = Vec::new();
    for path in paths {
        match load_profile_file(&path).await {
            Ok(profile) => {
                debug!(path = %path.display(), profile = %profile.id, "Loaded user profile");
                profiles.push(profile);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping profile file");
                errors.push(e);
            }
        }
    }

    Ok((profiles, errors))
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn is_profile_file(path: &Path) -> bool {
    path.is_file() && matches!(extension(path).as_deref(), Some("yaml" | "yml" | "json"))
}

// ============================================================================
// Tests
// ============================================================================
