//! Engine settings and their loader.
//!
//! Settings are read from a TOML file; every field has a default so an
//! empty file (or no file at all) is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::schema::ExecutionMode;

/// Settings shared by every controller in a registry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Directory holding one sub-directory per owner.
    pub config_root: PathBuf,

    /// Staleness window for cached decodes, in milliseconds.
    pub cache_ttl_ms: u64,

    /// File watcher polling interval, in milliseconds.
    pub poll_interval_ms: u64,

    /// Start a file watcher for every registered owner.
    pub watch_files: bool,

    /// Execution mode used to filter restricted sections.
    pub mode: ExecutionMode,

    /// Host platform information, used for log banners.
    pub host: HostSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            config_root: PathBuf::from("config"),
            cache_ttl_ms: 3000,
            poll_interval_ms: 2000,
            watch_files: true,
            mode: ExecutionMode::Client,
            host: HostSettings::default(),
        }
    }
}

/// Host platform strings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostSettings {
    /// Host application version.
    pub version: String,

    /// Name of the loader running the host.
    pub loader: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            loader: "standalone".to_string(),
        }
    }
}

impl EngineSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// `<config_root>/<owner>/<owner>_config.toml`
    pub fn config_path(&self, owner: &str) -> PathBuf {
        self.config_root
            .join(owner)
            .join(format!("{owner}_config.toml"))
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.config_root.as_os_str().is_empty() {
            return Err(SettingsError::Invalid("config_root must not be empty".into()));
        }
        if self.cache_ttl_ms == 0 {
            return Err(SettingsError::Invalid("cache_ttl_ms must be greater than 0".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Load and validate settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<EngineSettings, SettingsError> {
    let content = fs::read_to_string(path)?;
    let settings: EngineSettings = toml::from_str(&content)?;

    settings.validate()?;

    Ok(settings)
}
