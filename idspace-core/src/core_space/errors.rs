//! Error types for space orchestration

use crate::core_identity::IdentityError;
use crate::core_store::StoreError;
use thiserror::Error;

/// Result type for space operations
pub type SpaceResult<T> = Result<T, SpaceError>;

#[derive(Debug, Error)]
pub enum SpaceError {
    /// Not a well-formed `/orbitdb/<root>/<path>` address
    #[error("Invalid store address: {0}")]
    InvalidAddress(String),

    /// Thread address belongs to another space
    #[error("Thread belongs to space '{actual}', expected '{expected}'")]
    CrossSpace { expected: String, actual: String },

    #[error("Space not open: {0}")]
    NotOpen(String),

    /// Background sync of the space store failed or timed out
    #[error("Sync failed: {0}")]
    Sync(String),

    /// Thread backend failure
    #[error("Thread error: {0}")]
    Thread(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
