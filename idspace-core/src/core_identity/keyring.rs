//! Keyring module
//!
//! A keyring is the full key material of one identity or one space, derived
//! deterministically from a [`KeyringSeed`]:
//! - Ed25519 signing key (signatures, JWTs)
//! - Ed25519 management key
//! - X25519 asymmetric encryption key
//! - salt for hashing private partition keys
//!
//! Secret keys are zeroized on drop and never appear in `Debug` output.

use super::encryption::{self, EncryptedEnvelope};
use super::errors::{IdentityError, IdentityResult};
use super::hashing::sha256_multihash;
use super::seed::KeyringSeed;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

const KDF_SALT: &[u8] = b"idspace-keyring-v1";
const SIGNING_INFO: &[u8] = b"signing";
const MANAGEMENT_INFO: &[u8] = b"management";
const ENCRYPTION_INFO: &[u8] = b"asym-encryption";
const DB_SALT_INFO: &[u8] = b"db-salt";

/// Hex-encoded public halves of a keyring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeys {
    #[serde(rename = "signingKey")]
    pub signing_key: String,
    #[serde(rename = "managementKey")]
    pub management_key: String,
    #[serde(rename = "asymEncryptionKey")]
    pub asym_encryption_key: String,
}

pub struct Keyring {
    seed: KeyringSeed,
    signing: SigningKey,
    management: SigningKey,
    encryption: StaticSecret,
    db_salt: [u8; 32],
}

impl Keyring {
    /// Derive every key of the keyring from `seed`
    pub fn new(seed: KeyringSeed) -> IdentityResult<Self> {
        let hk = Hkdf::<Sha256>::new(Some(KDF_SALT), seed.as_bytes());

        let mut signing = expand(&hk, SIGNING_INFO)?;
        let mut management = expand(&hk, MANAGEMENT_INFO)?;
        let mut encryption = expand(&hk, ENCRYPTION_INFO)?;
        let db_salt = expand(&hk, DB_SALT_INFO)?;

        let keyring = Keyring {
            signing: SigningKey::from_bytes(&signing),
            management: SigningKey::from_bytes(&management),
            encryption: StaticSecret::from(encryption),
            db_salt,
            seed,
        };

        signing.zeroize();
        management.zeroize();
        encryption.zeroize();
        Ok(keyring)
    }

    /// Seed this keyring was derived from (for persistence)
    pub fn seed(&self) -> &KeyringSeed {
        &self.seed
    }

    pub fn public_keys(&self) -> PublicKeys {
        PublicKeys {
            signing_key: hex::encode(self.signing.verifying_key().to_bytes()),
            management_key: hex::encode(self.management.verifying_key().to_bytes()),
            asym_encryption_key: hex::encode(self.encryption_public_key().as_bytes()),
        }
    }

    pub fn encryption_public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from(&self.encryption)
    }

    /// Sign a message with the signing key (64-byte Ed25519 signature)
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        self.signing.sign(msg).to_bytes().to_vec()
    }

    /// Sign a message with the management key
    pub fn sign_management(&self, msg: &[u8]) -> Vec<u8> {
        self.management.sign(msg).to_bytes().to_vec()
    }

    /// Verify a signature made by this keyring's signing key
    pub fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        verify_with_pubkey(&self.signing.verifying_key(), msg, sig)
    }

    /// Signer for JWTs issued on behalf of this keyring
    pub fn jwt_signer(&self) -> JwtSigner {
        JwtSigner {
            key: self.signing.clone(),
        }
    }

    /// Encrypt to this keyring's own encryption key
    pub fn encrypt(&self, plaintext: &[u8]) -> IdentityResult<EncryptedEnvelope> {
        encryption::seal(&self.encryption_public_key(), plaintext)
    }

    pub fn decrypt(&self, envelope: &EncryptedEnvelope) -> IdentityResult<Vec<u8>> {
        encryption::open(&self.encryption, envelope)
    }

    /// One-way hash of a private partition key in `space`
    ///
    /// Input is `salt || space || 0x00 || key`; the separator keeps
    /// `("a.b", "c")` and `("a", "b.c")` apart.
    pub fn hash_db_key(&self, key: &str, space: &str) -> String {
        let mut input = Vec::with_capacity(self.db_salt.len() + space.len() + 1 + key.len());
        input.extend_from_slice(&self.db_salt);
        input.extend_from_slice(space.as_bytes());
        input.push(0);
        input.extend_from_slice(key.as_bytes());
        let hash = sha256_multihash(&input);
        input.zeroize();
        hash
    }
}

impl Drop for Keyring {
    fn drop(&mut self) {
        self.db_salt.zeroize();
    }
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self.public_keys();
        f.debug_struct("Keyring")
            .field("signing", &keys.signing_key)
            .field("encryption", &keys.asym_encryption_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Detached Ed25519 signer handed to the JWT primitive
#[derive(Clone)]
pub struct JwtSigner {
    key: SigningKey,
}

impl JwtSigner {
    pub fn sign(&self, signing_input: &[u8]) -> Vec<u8> {
        self.key.sign(signing_input).to_bytes().to_vec()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSigner")
            .field("public", &hex::encode(self.key.verifying_key().to_bytes()))
            .finish()
    }
}

/// Verify an Ed25519 signature against a public key
pub fn verify_with_pubkey(pubkey: &VerifyingKey, msg: &[u8], sig: &[u8]) -> bool {
    match Signature::from_slice(sig) {
        Ok(signature) => pubkey.verify(msg, &signature).is_ok(),
        Err(_) => false,
    }
}

fn expand(hk: &Hkdf<Sha256>, info: &[u8]) -> IdentityResult<[u8; 32]> {
    let mut okm = [0u8; 32];
    hk.expand(info, &mut okm)
        .map_err(|e| IdentityError::Crypto(format!("HKDF expand failed: {}", e)))?;
    Ok(okm)
}
