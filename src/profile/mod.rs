//! Connection Profile Management
//!
//! This module handles loading and saving named database connection profiles.
//! A profile bundles everything needed to reach one MySQL database; the
//! engine consumes a resolved [`ConnectionProfile`] per call and never reads
//! the store itself.
//!
//! # Store Location
//! - Explicit path (CLI `--store`), or
//! - `~/.config/sqlporter/profiles.json` (per-user default)
//!
//! Profile names are unique keys. The store is a plain JSON file so it can be
//! shared or checked in (minus passwords) when teams want to.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SqlPorterError};

/// Connection parameters for one named MySQL database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionProfile {
    /// Unique profile name (e.g., "local", "staging")
    pub name: String,

    /// Hostname or IP address
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Database (schema) name
    pub database: String,

    /// Username
    pub user: String,

    /// Password
    /// WARNING: sensitive, never logged or echoed in error messages
    pub password: String,
}

/// On-disk profile collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProfileFile {
    profiles: Vec<ConnectionProfile>,
}

/// A loaded profile store bound to its backing file
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: Vec<ConnectionProfile>,
}

/// Get path to the default per-user store (`~/.config/sqlporter/profiles.json`)
pub fn default_store_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| SqlPorterError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("sqlporter").join("profiles.json"))
}

impl ProfileStore {
    /// Load the store from `path`. A missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self { path, profiles: Vec::new() });
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| SqlPorterError::config_error(format!("Could not read profile store: {e}")))?;

        let file: ProfileFile = serde_json::from_str(&contents)
            .map_err(|e| SqlPorterError::config_error(format!("Invalid profile store format: {e}")))?;

        Ok(Self { path, profiles: file.profiles })
    }

    /// Load the store from the default per-user location.
    pub fn load_default() -> Result<Self> {
        Self::load(default_store_path()?)
    }

    /// Persist the store, creating the parent directory if needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SqlPorterError::config_error(format!("Could not create store directory: {e}"))
            })?;
        }

        let file = ProfileFile { profiles: self.profiles.clone() };
        let contents = serde_json::to_string_pretty(&file)
            .map_err(|e| SqlPorterError::config_error(format!("Could not serialize store: {e}")))?;

        fs::write(&self.path, contents)
            .map_err(|e| SqlPorterError::config_error(format!("Could not write profile store: {e}")))
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All profiles, in insertion order.
    #[must_use]
    pub fn list(&self) -> &[ConnectionProfile] {
        &self.profiles
    }

    /// Look up one profile by name.
    pub fn get(&self, name: &str) -> Result<&ConnectionProfile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| SqlPorterError::config_error(format!("Profile '{name}' not found")))
    }

    /// Add a profile; the name must not already be taken.
    pub fn add(&mut self, profile: ConnectionProfile) -> Result<()> {
        if self.profiles.iter().any(|p| p.name == profile.name) {
            return Err(SqlPorterError::config_error(format!(
                "Profile '{}' already exists",
                profile.name
            )));
        }
        self.profiles.push(profile);
        Ok(())
    }

    /// Replace the profile stored under `old_name` (the replacement may rename it).
    pub fn update(&mut self, old_name: &str, profile: ConnectionProfile) -> Result<()> {
        if profile.name != old_name && self.profiles.iter().any(|p| p.name == profile.name) {
            return Err(SqlPorterError::config_error(format!(
                "Profile '{}' already exists",
                profile.name
            )));
        }
        let slot = self
            .profiles
            .iter_mut()
            .find(|p| p.name == old_name)
            .ok_or_else(|| SqlPorterError::config_error(format!("Profile '{old_name}' not found")))?;
        *slot = profile;
        Ok(())
    }

    /// Remove a profile by name.
    pub fn remove(&mut self, name: &str) -> Result<ConnectionProfile> {
        let position = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| SqlPorterError::config_error(format!("Profile '{name}' not found")))?;
        Ok(self.profiles.remove(position))
    }
}
