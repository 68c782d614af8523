//! Persisted system settings.
//!
//! Settings are stored as a TOML file next to the application data. Loading
//! falls back to defaults when the file is missing or unreadable, so a fresh
//! installation starts with a sane configuration.

use crate::error::{FlowVisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings filename inside the application data directory.
pub const SETTINGS_FILE: &str = "settings.toml";

/// System-wide engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// Gate for hot-reloading modules at runtime; off by default since a
    /// reload tears down every non-protected module.
    pub runtime_module_reloading: bool,

    /// Write the workspace to a backup file after structural changes.
    pub autosave_workspace: bool,

    /// Default log filter, e.g. "info" or "flowvis_rs=debug".
    pub log_filter: String,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            runtime_module_reloading: false,
            autosave_workspace: true,
            log_filter: "info".to_string(),
        }
    }
}

impl SystemSettings {
    /// Load settings, falling back to defaults when the file is missing or
    /// malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => match toml::from_str(&text) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Malformed settings file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| FlowVisError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = SystemSettings::load_or_default("/nonexistent/settings.toml");
        assert!(!settings.runtime_module_reloading);
        assert!(settings.autosave_workspace);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        let mut settings = SystemSettings::default();
        settings.runtime_module_reloading = true;
        settings.log_filter = "flowvis_rs=debug".to_string();
        settings.save(&path).unwrap();

        let loaded = SystemSettings::load_or_default(&path);
        assert!(loaded.runtime_module_reloading);
        assert_eq!(loaded.log_filter, "flowvis_rs=debug");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "runtime_module_reloading = true\n").unwrap();

        let loaded = SystemSettings::load_or_default(&path);
        assert!(loaded.runtime_module_reloading);
        assert_eq!(loaded.log_filter, "info");
    }
}
