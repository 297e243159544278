//! Identity management module
//!
//! - [`IdentityCore`]: main + per-space keyrings, DID, persistence
//! - [`Keyring`]: seed-derived signing, management and encryption keys
//! - [`Authorizer`] / [`AuthDelegate`]: external consent collaborators
//! - [`IdentityStorage`]: persisted identity records
//! - [`ContentStore`] / [`PinningService`]: identity document publication

pub mod auth;
pub mod document;
pub mod encryption;
mod errors;
pub mod hashing;
mod identity;
pub mod jwt;
pub mod keyring;
pub mod publish;
pub mod record;
pub mod seed;
pub mod storage;

#[cfg(test)]
mod tests;

pub use auth::{AuthDelegate, AuthError, Authorizer, ConsentRequest, WalletSigner};
pub use document::{Did, IdentityDocument};
pub use encryption::EncryptedEnvelope;
pub use errors::{IdentityError, IdentityResult};
pub use identity::{BootstrapOptions, ConsentCallback, IdentityCore, IdentityServices};
pub use keyring::{JwtSigner, Keyring, PublicKeys};
pub use publish::{
    ContentStore, MemoryContentStore, MemoryPinningService, PinningService, PublishError,
};
pub use record::{normalize_address, IdentityRecord};
pub use seed::KeyringSeed;
pub use storage::{FileIdentityStorage, IdentityStorage, MemoryIdentityStorage, StorageError};
