//! # Application Configuration
//!
//! Settings live in a YAML file `config.yaml` inside the data directory,
//! next to the SQLite database:
//!
//! ```text
//! Tuition Tracker/
//! ├── config.yaml      ← This module manages this file
//! └── tuition.db
//! ```
//!
//! ## YAML Format
//!
//! ```yaml
//! database_file: "tuition.db"
//! log_level: "info"
//! reminders:
//!   enabled: true
//!   lead_minutes: 60
//!   weeks: 4
//! ```
//!
//! Missing fields fall back to their defaults. The data directory defaults to
//! the platform data directory and can be moved with `TUITION_TRACKER_DATA_DIR`.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const DATA_DIR_ENV: &str = "TUITION_TRACKER_DATA_DIR";
const APP_DIRECTORY_NAME: &str = "Tuition Tracker";
const MAX_REMINDER_WEEKS: u32 = 8;

/// Class reminder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Whether the host can deliver notifications at all
    pub enabled: bool,
    /// Minutes before the class that the reminder fires
    pub lead_minutes: u32,
    /// Number of weeks planned ahead
    pub weeks: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lead_minutes: 60,
            weeks: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory the file was loaded from; never read from the file itself
    #[serde(skip)]
    pub data_directory: PathBuf,
    /// Database file name, relative to the data directory
    pub database_file: String,
    pub log_level: String,
    pub reminders: ReminderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            database_file: "tuition.db".to_string(),
            log_level: "info".to_string(),
            reminders: ReminderConfig::default(),
        }
    }
}

/// Platform data directory for the app, or the working directory as a last resort
pub fn default_data_directory() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIRECTORY_NAME)
}

/// Pick the data directory from an override value, falling back to the default
pub fn resolve_data_directory(override_value: Option<String>) -> PathBuf {
    match override_value {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
        _ => default_data_directory(),
    }
}

impl AppConfig {
    /// Load the configuration from the data directory chosen by the environment
    pub fn load() -> Result<Self> {
        let data_directory = resolve_data_directory(std::env::var(DATA_DIR_ENV).ok());
        Self::load_from_dir(&data_directory)
    }

    /// Load `config.yaml` from a directory, using defaults when it doesn't exist
    pub fn load_from_dir(data_directory: &Path) -> Result<Self> {
        let config_path = data_directory.join(CONFIG_FILE_NAME);

        let mut config = if config_path.exists() {
            let yaml_content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {:?}", config_path))?;
            let config: AppConfig = serde_yaml::from_str(&yaml_content)
                .with_context(|| format!("Failed to parse {:?}", config_path))?;
            debug!("Loaded config from {:?}", config_path);
            config
        } else {
            info!("No config at {:?}, using defaults", config_path);
            AppConfig::default()
        };

        config.data_directory = data_directory.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to `config.yaml` in its data directory
    pub fn save(&self) -> Result<()> {
        self.validate()?;
        fs::create_dir_all(&self.data_directory)
            .with_context(|| format!("Failed to create {:?}", self.data_directory))?;

        let config_path = self.data_directory.join(CONFIG_FILE_NAME);
        let yaml_content = serde_yaml::to_string(self)?;
        fs::write(&config_path, yaml_content)
            .with_context(|| format!("Failed to write {:?}", config_path))?;

        info!("Saved config to {:?}", config_path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_file.trim().is_empty() {
            bail!("database_file cannot be empty");
        }
        if self.reminders.lead_minutes < 1 {
            bail!("reminders.lead_minutes must be at least 1");
        }
        if !(1..=MAX_REMINDER_WEEKS).contains(&self.reminders.weeks) {
            bail!("reminders.weeks must be between 1 and {}", MAX_REMINDER_WEEKS);
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_directory.join(&self.database_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_config_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let config = AppConfig::load_from_dir(temp_dir.path()).expect("Failed to load config");

        assert_eq!(config.data_directory, temp_dir.path());
        assert_eq!(config.database_path(), temp_dir.path().join("tuition.db"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.reminders, ReminderConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "log_level: debug\nreminders:\n  lead_minutes: 30\n",
        )
        .unwrap();

        let config = AppConfig::load_from_dir(temp_dir.path()).expect("Failed to load config");

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.database_file, "tuition.db");
        assert_eq!(config.reminders.lead_minutes, 30);
        assert_eq!(config.reminders.weeks, 4);
        assert!(config.reminders.enabled);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_directory = temp_dir.path().join("nested");
        let mut config = AppConfig::load_from_dir(&data_directory).unwrap();
        config.database_file = "lessons.db".to_string();
        config.reminders.enabled = false;

        config.save().expect("Failed to save config");
        let reloaded = AppConfig::load_from_dir(&data_directory).unwrap();

        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join(CONFIG_FILE_NAME);

        fs::write(&path, "reminders:\n  weeks: 9\n").unwrap();
        assert!(AppConfig::load_from_dir(temp_dir.path()).is_err());

        fs::write(&path, "reminders:\n  lead_minutes: 0\n").unwrap();
        assert!(AppConfig::load_from_dir(temp_dir.path()).is_err());

        fs::write(&path, "log_level: [not, a, string]\n").unwrap();
        assert!(AppConfig::load_from_dir(temp_dir.path()).is_err());
    }

    #[test]
    fn test_resolve_data_directory() {
        assert_eq!(
            resolve_data_directory(Some("/tmp/tuition".to_string())),
            PathBuf::from("/tmp/tuition")
        );
        assert_eq!(resolve_data_directory(Some("  ".to_string())), default_data_directory());
        assert_eq!(resolve_data_directory(None), default_data_directory());
    }
}
