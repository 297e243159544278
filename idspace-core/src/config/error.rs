//! Errors raised while loading, saving or validating an idspace config

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML file could not be read from disk
    #[error("Cannot read idspace config file: {0}")]
    FileReadError(String),

    #[error("Cannot write idspace config file: {0}")]
    FileWriteError(String),

    /// The file is not valid TOML or does not match the config sections
    #[error("Malformed idspace config: {0}")]
    ParseError(String),

    #[error("Cannot serialize idspace config: {0}")]
    SerializeError(String),

    /// An `IDSPACE_*` environment override did not parse
    #[error("Invalid environment override: {0}")]
    InvalidValue(String),

    /// Parsed values that identity or space setup cannot work with
    #[error("Invalid idspace config: {0}")]
    ValidationFailed(String),
}
