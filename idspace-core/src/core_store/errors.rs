/*
    errors.rs - Error types for the store layer

    Covers reducer input-contract violations, backend failures and
    private-partition envelope handling.
*/

use thiserror::Error;

/// Errors that can occur in the store layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key was empty
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// `set_multiple` called with differently sized key and value lists
    #[error("Length mismatch: {keys} keys but {values} values")]
    LengthMismatch { keys: usize, values: usize },

    /// Underlying store failure
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Private entry could not be decrypted or decoded
    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Store was used before `load()`
    #[error("Store not loaded: {0}")]
    NotLoaded(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
