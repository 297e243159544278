//! Keyring seeds and the consent → seed derivation chain
//!
//! signature --sha256--> 256-bit entropy --bip39--> mnemonic --pbkdf2--> seed

use super::errors::{IdentityError, IdentityResult};
use super::hashing::sha256;
use bip39::Mnemonic;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroize;

/// Raw seed material a keyring is derived from
///
/// Serialized as `0x`-prefixed lowercase hex.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyringSeed(Vec<u8>);

impl KeyringSeed {
    pub fn from_bytes(bytes: Vec<u8>) -> IdentityResult<Self> {
        if bytes.is_empty() {
            return Err(IdentityError::MalformedState("empty seed".to_string()));
        }
        Ok(KeyringSeed(bytes))
    }

    pub fn from_hex(s: &str) -> IdentityResult<Self> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed)
            .map_err(|e| IdentityError::MalformedState(format!("invalid seed hex: {}", e)))?;
        Self::from_bytes(bytes)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Derive a seed from a consent signature
    pub fn from_signature(signature: &[u8]) -> IdentityResult<Self> {
        let entropy = sha256(signature);
        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| IdentityError::Crypto(format!("mnemonic derivation failed: {}", e)))?;
        Self::from_bytes(mnemonic.to_seed_normalized("").to_vec())
    }
}

impl Drop for KeyringSeed {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for KeyringSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyringSeed").field(&"<redacted>").finish()
    }
}

impl Serialize for KeyringSeed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for KeyringSeed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        KeyringSeed::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Message signed to authorize creation of the main identity
pub fn identity_consent_message() -> String {
    "This app wants to view and update your 3Box profile.".to_string()
}

/// Message signed to authorize opening a space
pub fn space_consent_message(space: &str) -> String {
    format!("Allow this app to open your {} space.", space)
}
