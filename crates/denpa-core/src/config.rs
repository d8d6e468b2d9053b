use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::DenpaError;
use crate::models::SyncKind;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub sync: SyncConfig,
    pub history: HistoryConfig,
}

/// Remote provider endpoint and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

/// Per-kind sync gate thresholds, in hours since the last successful sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub movies_hours: i64,
    pub series_hours: i64,
    pub live_hours: i64,
    pub epg_hours: i64,
}

impl SyncConfig {
    pub fn threshold_hours(&self, kind: SyncKind) -> i64 {
        match kind {
            SyncKind::Movies => self.movies_hours,
            SyncKind::Series => self.series_hours,
            SyncKind::Live => self.live_hours,
            SyncKind::Epg => self.epg_hours,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub read_limit: u32,
}

impl AppConfig {
    /// Load config: user file (if exists) over built-in defaults.
    pub fn load() -> Result<Self, DenpaError> {
        let user_path = Self::config_path();
        if user_path.exists() {
            let user_str = std::fs::read_to_string(&user_path)?;
            toml::from_str(&user_str).map_err(|e| DenpaError::Config(e.to_string()))
        } else {
            toml::from_str(DEFAULT_CONFIG).map_err(|e| DenpaError::Config(e.to_string()))
        }
    }

    /// Save current config to the user config file.
    pub fn save(&self) -> Result<(), DenpaError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| DenpaError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Path to the database file.
    pub fn db_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().join("denpa.db"))
            .unwrap_or_else(|| PathBuf::from("denpa.db"))
    }

    /// Ensure the data directory exists and return the DB path.
    pub fn ensure_db_path() -> Result<PathBuf, DenpaError> {
        let path = Self::db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "denpa")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = AppConfig::default();
        assert_eq!(config.sync.movies_hours, 24);
        assert_eq!(config.sync.live_hours, 12);
        assert_eq!(config.sync.epg_hours, 1);
        assert_eq!(config.history.read_limit, 100);
    }

    #[test]
    fn test_threshold_table() {
        let config = AppConfig::default();
        assert_eq!(config.sync.threshold_hours(SyncKind::Movies), 24);
        assert_eq!(config.sync.threshold_hours(SyncKind::Series), 24);
        assert_eq!(config.sync.threshold_hours(SyncKind::Live), 12);
        assert_eq!(config.sync.threshold_hours(SyncKind::Epg), 1);
    }

    #[test]
    fn test_roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.sync.movies_hours, config.sync.movies_hours);
        assert_eq!(deserialized.provider.timeout_secs, config.provider.timeout_secs);
    }
}
