//! Partition-tagged store keys
//!
//! Both reducers share one underlying store. The partition is part of the
//! key type, so a public key can never be mistaken for a private one; the
//! string prefix only exists at the storage boundary.

use super::errors::{StoreError, StoreResult};
use std::fmt;

const PUBLIC_PREFIX: &str = "pub_";
const PRIVATE_PREFIX: &str = "priv_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    Public,
    Private,
}

impl Partition {
    fn prefix(self) -> &'static str {
        match self {
            Partition::Public => PUBLIC_PREFIX,
            Partition::Private => PRIVATE_PREFIX,
        }
    }
}

/// A key inside one partition
///
/// For the private partition `raw` is already the hashed key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    partition: Partition,
    raw: String,
}

impl StoreKey {
    pub fn new(partition: Partition, raw: impl Into<String>) -> StoreResult<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(StoreError::InvalidKey("key must not be empty".to_string()));
        }
        Ok(StoreKey { partition, raw })
    }

    pub fn public(raw: impl Into<String>) -> StoreResult<Self> {
        Self::new(Partition::Public, raw)
    }

    pub fn private(hashed: impl Into<String>) -> StoreResult<Self> {
        Self::new(Partition::Private, hashed)
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Prefixed string form used by the underlying store
    pub fn to_db_key(&self) -> String {
        format!("{}{}", self.partition.prefix(), self.raw)
    }

    /// Recover a key from its stored form; keys outside both partitions
    /// yield `None`
    pub fn parse(db_key: &str) -> Option<Self> {
        [Partition::Public, Partition::Private]
            .into_iter()
            .find_map(|partition| {
                db_key
                    .strip_prefix(partition.prefix())
                    .filter(|raw| !raw.is_empty())
                    .map(|raw| StoreKey {
                        partition,
                        raw: raw.to_string(),
                    })
            })
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_db_key())
    }
}
