//! Configuration file handling for ~/.fieldtrack/config.ini.
//!
//! A missing file yields defaults. Parsing lives in [`super::parser`] and
//! serialization in [`super::writer`].

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::settings::TrackerConfig;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl TrackerConfig {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Write a default config file at `path` unless one exists.
    ///
    /// Returns `true` if a file was created.
    pub fn ensure_exists_at(path: &Path) -> Result<bool, ConfigFileError> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }
}

/// Get the path to the config directory (~/.fieldtrack).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fieldtrack")
}

/// Get the path to the config file (~/.fieldtrack/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = TrackerConfig::load_from(&temp.path().join("absent.ini")).unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let config = TrackerConfig::default()
            .with_min_accuracy_meters(65.0)
            .with_retry_delay(Duration::from_millis(1_500))
            .with_max_relaxed_retries(1)
            .with_error_notify_interval(Duration::from_secs(45))
            .with_event_channel_capacity(64);
        config.save_to(&path).unwrap();

        let loaded = TrackerConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_truncates_to_whole_seconds() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        TrackerConfig::default()
            .with_staleness_override(Duration::from_millis(15_900))
            .save_to(&path)
            .unwrap();

        let loaded = TrackerConfig::load_from(&path).unwrap();
        assert_eq!(loaded.staleness_override, Duration::from_secs(15));
    }

    #[test]
    fn test_partial_file_overlays_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[tracking]\nhigh_accuracy_timeout_secs = 40\n").unwrap();

        let config = TrackerConfig::load_from(&path).unwrap();
        assert_eq!(config.high_accuracy_timeout, Duration::from_secs(40));
        assert_eq!(config.retry_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_value_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[tracking]\nmax_relaxed_retries = 5\n").unwrap();

        let err = TrackerConfig::load_from(&path).unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, .. } => {
                assert_eq!(section, "tracking");
                assert_eq!(key, "max_relaxed_retries");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ensure_exists_at() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        assert!(TrackerConfig::ensure_exists_at(&path).unwrap());
        assert!(!TrackerConfig::ensure_exists_at(&path).unwrap());
        assert_eq!(
            TrackerConfig::load_from(&path).unwrap(),
            TrackerConfig::default()
        );
    }

    #[test]
    fn test_config_file_path() {
        let path = config_file_path();
        assert!(path.ends_with(".fieldtrack/config.ini"));
    }
}
