//! Error types for identity operations

use super::auth::AuthError;
use super::publish::PublishError;
use super::storage::StorageError;
use thiserror::Error;

/// Result type for identity operations
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Errors that can occur while deriving, persisting or using an identity
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Persisted record could not be parsed or is missing its seed
    #[error("Malformed identity state: {0}")]
    MalformedState(String),

    /// The authorization mechanism refused or failed
    #[error("Authorization failed: {0}")]
    Authorization(#[from] AuthError),

    /// Primary publication of the identity document failed
    #[error("Publication failed: {0}")]
    Publication(#[from] PublishError),

    /// Persisted identity storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// No keyring is registered for the space
    #[error("Unknown space: {0}")]
    UnknownSpace(String),

    /// Key derivation, encryption or decryption failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The identity document has not been published yet
    #[error("Identity not published")]
    NotPublished,
}

impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        IdentityError::Serialization(err.to_string())
    }
}
