//! Identity documents and decentralized identifiers
//!
//! The DID is `did:<method>:<content address of the canonical document>`; the
//! fingerprint is the multihash of the DID string and is used to recognise
//! compound space names that refer to the main keyring.

use super::hashing::sha256_multihash;
use super::keyring::PublicKeys;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DOCUMENT_VERSION: u32 = 1;
pub const DEFAULT_DID_METHOD: &str = "muport";

/// Canonical identity document published to content-addressed storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDocument {
    pub version: u32,
    #[serde(rename = "signingKey")]
    pub signing_key: String,
    #[serde(rename = "managementKey")]
    pub management_key: String,
    #[serde(rename = "asymEncryptionKey")]
    pub asym_encryption_key: String,
}

impl IdentityDocument {
    /// Build the document; the management address, when known, replaces the
    /// keyring's management key
    pub fn new(keys: PublicKeys, management_address: Option<&str>) -> Self {
        IdentityDocument {
            version: DOCUMENT_VERSION,
            signing_key: keys.signing_key,
            management_key: management_address
                .map(str::to_string)
                .unwrap_or(keys.management_key),
            asym_encryption_key: keys.asym_encryption_key,
        }
    }

    /// Canonical byte form (field order is fixed by the struct)
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// A published decentralized identifier with its fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Did {
    did: String,
    fingerprint: String,
}

impl Did {
    pub fn new(method: &str, content_address: &str) -> Self {
        let did = format!("did:{}:{}", method, content_address);
        let fingerprint = sha256_multihash(did.as_bytes());
        Did { did, fingerprint }
    }

    pub fn as_str(&self) -> &str {
        &self.did
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.did)
    }
}
