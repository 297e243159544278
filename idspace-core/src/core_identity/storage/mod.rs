//! Persisted identity storage
//!
//! A string key-value store holding serialized identity records under
//! `<prefix><normalized management address>`.

use thiserror::Error;

pub mod file_storage;
pub mod memory_storage;

pub use file_storage::FileIdentityStorage;
pub use memory_storage::MemoryIdentityStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Abstract identity record storage
pub trait IdentityStorage: Send + Sync {
    /// Load the value stored under `key`, if any
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
