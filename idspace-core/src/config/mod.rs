//! Configuration management for idspace
//!
//! Defaults, TOML files and `IDSPACE_<SECTION>_<KEY>` environment overrides.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Prefix of the persisted identity record key, followed by the normalized address
pub const DEFAULT_STORAGE_KEY_PREFIX: &str = "serialized3id_";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub identity: IdentityConfig,
    pub pinning: PinningConfig,
    pub space: SpaceConfig,
    pub logging: LoggingConfig,
}

/// Identity persistence and DID settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Directory holding persisted identity records
    pub storage_dir: PathBuf,

    /// Key prefix for persisted identity records
    pub storage_key_prefix: String,

    /// DID method name (`did:<method>:<hash>`)
    pub did_method: String,
}

/// Secondary pinning of the identity document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinningConfig {
    pub enabled: bool,

    /// Give up on a pin attempt after this long
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Space orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    /// Maximum root index entries scanned during reconciliation (None = all)
    pub root_index_limit: Option<usize>,

    /// Upper bound on how long callers wait for a space sync
    #[serde(with = "humantime_serde")]
    pub sync_timeout: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
    pub with_timestamp: bool,
    pub with_target: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./data/identities"),
            storage_key_prefix: DEFAULT_STORAGE_KEY_PREFIX.to_string(),
            did_method: "muport".to_string(),
        }
    }
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            root_index_limit: None,
            sync_timeout: Duration::from_secs(60),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: IDSPACE_<SECTION>_<KEY>
    /// Example: IDSPACE_IDENTITY_STORAGE_DIR=/var/lib/idspace
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let mut config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(dir) = env::var("IDSPACE_IDENTITY_STORAGE_DIR") {
            self.identity.storage_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = env::var("IDSPACE_IDENTITY_STORAGE_KEY_PREFIX") {
            self.identity.storage_key_prefix = prefix;
        }
        if let Ok(method) = env::var("IDSPACE_IDENTITY_DID_METHOD") {
            self.identity.did_method = method;
        }

        if let Ok(enabled) = env::var("IDSPACE_PINNING_ENABLED") {
            self.pinning.enabled = enabled
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid pinning flag: {}", e)))?;
        }

        if let Ok(limit) = env::var("IDSPACE_SPACE_ROOT_INDEX_LIMIT") {
            let limit: i64 = limit.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid root index limit: {}", e))
            })?;
            // -1 keeps the log-store convention for "no limit"
            self.space.root_index_limit = usize::try_from(limit).ok();
        }

        if let Ok(level) = env::var("IDSPACE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = env::var("IDSPACE_LOG_JSON") {
            self.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.storage_key_prefix.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "storage_key_prefix must not be empty".to_string(),
            ));
        }

        if self.identity.did_method.is_empty()
            || !self
                .identity
                .did_method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid DID method: {}",
                self.identity.did_method
            )));
        }

        if self.pinning.timeout.is_zero() || self.space.sync_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        if self.space.root_index_limit == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "root_index_limit must be greater than 0 when set".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
