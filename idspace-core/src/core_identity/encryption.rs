/*
    encryption.rs - Asymmetric envelopes for private partition entries

    An ephemeral X25519 key agrees a shared secret with the recipient's
    encryption key; HKDF-SHA256 turns it into a ChaCha20-Poly1305 key.

    Security properties:
    - Authenticated encryption (AEAD)
    - Fresh ephemeral key and nonce per envelope
    - Only the holder of the recipient secret can open an envelope
*/

use super::errors::{IdentityError, IdentityResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

const ENVELOPE_INFO: &[u8] = b"idspace-envelope-v1";
const NONCE_LEN: usize = 12;

/// Encrypted payload as stored in the underlying log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    pub nonce: String,
    #[serde(rename = "ephemeralFrom")]
    pub ephemeral_from: String,
    pub ciphertext: String,
}

fn envelope_key(
    shared: &[u8; 32],
    ephemeral: &PublicKey,
    recipient: &PublicKey,
) -> IdentityResult<[u8; 32]> {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(ephemeral.as_bytes());
    salt[32..].copy_from_slice(recipient.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(&salt), shared);
    let mut okm = [0u8; 32];
    hk.expand(ENVELOPE_INFO, &mut okm)
        .map_err(|e| IdentityError::Crypto(format!("HKDF expand failed: {}", e)))?;
    Ok(okm)
}

/// Encrypt `plaintext` so that only `recipient`'s secret can open it
pub fn seal(recipient: &PublicKey, plaintext: &[u8]) -> IdentityResult<EncryptedEnvelope> {
    let mut ephemeral_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut ephemeral_bytes);
    let ephemeral = StaticSecret::from(ephemeral_bytes);
    ephemeral_bytes.zeroize();
    let ephemeral_public = PublicKey::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(recipient);
    let mut key = envelope_key(shared.as_bytes(), &ephemeral_public, recipient)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    key.zeroize();

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| IdentityError::Crypto(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedEnvelope {
        nonce: BASE64.encode(nonce_bytes),
        ephemeral_from: BASE64.encode(ephemeral_public.as_bytes()),
        ciphertext: BASE64.encode(ciphertext),
    })
}

/// Decrypt an envelope addressed to `secret`
pub fn open(secret: &StaticSecret, envelope: &EncryptedEnvelope) -> IdentityResult<Vec<u8>> {
    let nonce_bytes = decode_field("nonce", &envelope.nonce)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(IdentityError::Crypto("Invalid nonce length".to_string()));
    }
    let ephemeral: [u8; 32] = decode_field("ephemeralFrom", &envelope.ephemeral_from)?
        .try_into()
        .map_err(|_| IdentityError::Crypto("Invalid ephemeral key length".to_string()))?;
    let ciphertext = decode_field("ciphertext", &envelope.ciphertext)?;

    let ephemeral = PublicKey::from(ephemeral);
    let recipient = PublicKey::from(secret);
    let shared = secret.diffie_hellman(&ephemeral);
    let mut key = envelope_key(shared.as_bytes(), &ephemeral, &recipient)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    key.zeroize();

    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
        .map_err(|e| IdentityError::Crypto(format!("Decryption failed: {}", e)))
}

fn decode_field(name: &str, value: &str) -> IdentityResult<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| IdentityError::Crypto(format!("Invalid {} encoding: {}", name, e)))
}
