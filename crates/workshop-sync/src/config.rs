//! Configuration management for workshop-sync.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "workshop-sync";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "offline.db";

/// Base URL used when neither the config nor a persisted override sets one.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:9000/api";

/// Store setting under which a runtime API base override is persisted.
pub const API_BASE_SETTING: &str = "api_base";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `WORKSHOP_SYNC_`, `__` between levels)
/// 2. TOML config file at `~/.config/workshop-sync/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local store configuration.
    pub storage: StorageConfig,
    /// Remote service configuration.
    pub remote: RemoteConfig,
    /// Synchronization behaviour.
    pub sync: SyncConfig,
}

/// Local store configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/workshop-sync/offline.db`
    pub database_path: Option<PathBuf>,
}

/// Remote service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the remote API.
    pub api_base: String,
    /// Timeout for query and command calls, in seconds.
    pub query_timeout_secs: u64,
    /// Timeout for export downloads, in seconds.
    pub export_timeout_secs: u64,
}

/// Synchronization configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Put drained records back into their collections when a full sync fails.
    ///
    /// When disabled, a failed batch is dropped locally.
    pub requeue_on_failure: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            query_timeout_secs: 12,
            export_timeout_secs: 20,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            requeue_on_failure: true,
        }
    }
}

impl RemoteConfig {
    /// Get the query timeout as a Duration.
    #[must_use]
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Get the export timeout as a Duration.
    #[must_use]
    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("WORKSHOP_SYNC_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.remote.query_timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "query_timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.remote.export_timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "export_timeout_secs must be greater than 0".to_string(),
            });
        }

        validate_api_base(&self.remote.api_base)
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Pick the API base URL to use for this run.
    ///
    /// An explicit override wins, then a value persisted at runtime, then the
    /// configured base. Blank values are skipped.
    #[must_use]
    pub fn resolve_api_base(&self, explicit: Option<&str>, persisted: Option<&str>) -> String {
        [explicit, persisted, Some(self.remote.api_base.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|base| !base.is_empty())
            .unwrap_or(DEFAULT_API_BASE)
            .to_string()
    }
}

/// Check that a base URL is an absolute http(s) URL.
///
/// # Errors
///
/// Returns an error if the URL is blank, unparsable, or not http(s).
pub fn validate_api_base(api_base: &str) -> Result<()> {
    let trimmed = api_base.trim();
    if trimmed.is_empty() {
        return Err(Error::ConfigValidation {
            message: "api_base must not be empty".to_string(),
        });
    }

    let url = url::Url::parse(trimmed)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::ConfigValidation {
            message: format!("api_base must be an http(s) URL: {trimmed}"),
        });
    }
    Ok(())
}
