//! Sync configuration stored in `~/.bbb-recordings/config.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What the sync driver does when one recording fails to persist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure in the report and carry on with the next recording.
    #[default]
    Continue,
    /// Stop the pass; later recordings, cleanup and the stale sweep are skipped.
    Abort,
}

/// Recording sync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Playback type identifiers that are created as downloadable.
    #[serde(default)]
    pub downloadable_playback_types: Vec<String>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Description given to new recordings; `{time}` is replaced by the start time.
    #[serde(default = "default_description_template")]
    pub description_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
}

fn default_description_template() -> String {
    "Meeting held on {time}".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            downloadable_playback_types: Vec::new(),
            failure_policy: FailurePolicy::default(),
            description_template: default_description_template(),
            database_path: None,
        }
    }
}

impl SyncConfig {
    pub fn is_downloadable(&self, identifier: &str) -> bool {
        self.downloadable_playback_types
            .iter()
            .any(|t| t == identifier)
    }

    /// Default description for a recording that started at `start_time`
    /// (epoch seconds, UTC). `None` when the start time is unknown.
    pub fn describe_start(&self, start_time: Option<i64>) -> Option<String> {
        let started = chrono::DateTime::from_timestamp(start_time?, 0)?;
        let formatted = started.format("%B %d, %Y %H:%M").to_string();
        Some(self.description_template.replace("{time}", &formatted))
    }
}

/// Resolve the default config path: `~/.bbb-recordings/config.json`.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
    Ok(home.join(".bbb-recordings").join("config.json"))
}

/// Load the config from its default location, falling back to defaults when
/// no file exists yet.
pub fn load_config() -> Result<SyncConfig, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        log::debug!("No config at {}, using defaults", path.display());
        return Ok(SyncConfig::default());
    }
    load_config_at(&path)
}

/// Load the config from an explicit file.
pub fn load_config_at(path: &Path) -> Result<SyncConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    let config: SyncConfig = serde_json::from_str(&content)?;
    Ok(config)
}
