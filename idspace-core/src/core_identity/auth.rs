//! Authorization collaborators
//!
//! Two ways of obtaining consent:
//! - [`Authorizer`]: signs a canonical consent message for an address,
//!   optionally scoped to a space. The signature is hashed into seed entropy.
//! - [`AuthDelegate`]: an interactive, out-of-process flow that hands back a
//!   seed directly and manages its own caching.

use super::record::normalize_address;
use super::seed::{identity_consent_message, space_consent_message, KeyringSeed};
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User denied the authorization request")]
    Denied,

    #[error("Signer does not control address {0}")]
    AddressMismatch(String),

    #[error("No authorization mechanism available")]
    Unavailable,

    #[error("Authorization failed: {0}")]
    Other(String),
}

/// What the user is being asked to approve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRequest {
    /// Normalized account address, absent for delegated identities
    pub address: Option<String>,
    /// Space scope; `None` authorizes the main identity
    pub space: Option<String>,
}

impl ConsentRequest {
    pub fn identity(address: &str) -> Self {
        ConsentRequest {
            address: Some(normalize_address(address)),
            space: None,
        }
    }

    pub fn space(address: Option<&str>, space: &str) -> Self {
        ConsentRequest {
            address: address.map(normalize_address),
            space: Some(space.to_string()),
        }
    }

    /// Canonical message the signature covers
    pub fn message(&self) -> String {
        match &self.space {
            Some(space) => space_consent_message(space),
            None => identity_consent_message(),
        }
    }
}

/// External signer producing consent signatures
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Ask the user to sign `request.message()`; returns the raw signature
    async fn request_consent(&self, request: &ConsentRequest) -> Result<Vec<u8>, AuthError>;
}

/// Interactive authentication flow returning a one-shot seed
#[async_trait]
pub trait AuthDelegate: Send + Sync {
    async fn authenticate(&self) -> Result<KeyringSeed, AuthError>;
}

/// Local Ed25519 wallet that signs consent messages for one address
///
/// Ed25519 signatures are deterministic, so the same wallet always yields
/// the same seeds. Used by the CLI and in tests.
pub struct WalletSigner {
    address: String,
    key: SigningKey,
}

impl WalletSigner {
    pub fn new(address: &str, secret: [u8; 32]) -> Self {
        WalletSigner {
            address: normalize_address(address),
            key: SigningKey::from_bytes(&secret),
        }
    }

    /// Parse a 32-byte hex secret (`0x` prefix optional)
    pub fn from_hex(address: &str, secret_hex: &str) -> Result<Self, AuthError> {
        let trimmed = secret_hex.strip_prefix("0x").unwrap_or(secret_hex);
        let bytes: [u8; 32] = hex::decode(trimmed)
            .map_err(|e| AuthError::Other(format!("invalid wallet key: {}", e)))?
            .try_into()
            .map_err(|_| AuthError::Other("wallet key must be 32 bytes".to_string()))?;
        Ok(Self::new(address, bytes))
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Debug for WalletSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSigner")
            .field("address", &self.address)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Authorizer for WalletSigner {
    async fn request_consent(&self, request: &ConsentRequest) -> Result<Vec<u8>, AuthError> {
        match request.address.as_deref() {
            Some(address) if address == self.address => {}
            Some(address) => return Err(AuthError::AddressMismatch(address.to_string())),
            None => return Err(AuthError::AddressMismatch(String::new())),
        }
        Ok(self.key.sign(request.message().as_bytes()).to_bytes().to_vec())
    }
}
