//! Content hashing helpers
//!
//! Multihash strings are the base58 encoding of `0x12 0x20 || sha256(data)`,
//! the same form content-addressed storage uses for document addresses.

use sha2::{Digest, Sha256};

const SHA2_256_CODE: u8 = 0x12;
const SHA2_256_LEN: u8 = 0x20;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Base58 SHA-256 multihash of `data`
pub fn sha256_multihash(data: &[u8]) -> String {
    let digest = sha256(data);
    let mut bytes = Vec::with_capacity(34);
    bytes.push(SHA2_256_CODE);
    bytes.push(SHA2_256_LEN);
    bytes.extend_from_slice(&digest);
    bs58::encode(bytes).into_string()
}

/// Whether `s` decodes to a well-formed SHA-256 multihash
pub fn is_sha256_multihash(s: &str) -> bool {
    match bs58::decode(s).into_vec() {
        Ok(bytes) => {
            bytes.len() == 34 && bytes[0] == SHA2_256_CODE && bytes[1] == SHA2_256_LEN
        }
        Err(_) => false,
    }
}
