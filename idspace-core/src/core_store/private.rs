//! Private partition view
//!
//! Keys are hashed together with the space name under the space keyring's
//! salt before storage, and each value is stored as an encrypted
//! `{key, value}` envelope. The plaintext key lives inside the envelope so
//! enumeration can recover it.
//!
//! `all` and `log` decrypt every private entry; there is no index over
//! hashed keys.

use super::errors::{StoreError, StoreResult};
use super::key::{Partition, StoreKey};
use super::traits::KeyValueStore;
use super::types::{EntryMetadata, LogEntry, LogOperation, StoreEntry};
use crate::core_identity::{EncryptedEnvelope, Keyring};
use crate::metrics::{record_counter, PRIVATE_DECRYPTIONS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// Plaintext sealed inside each private envelope
#[derive(Debug, Serialize, Deserialize)]
struct PrivateEntry {
    key: String,
    value: Value,
}

#[derive(Clone)]
pub struct PrivateStore {
    store: Arc<dyn KeyValueStore>,
    keyring: Arc<Keyring>,
    space: String,
}

impl PrivateStore {
    pub fn new(store: Arc<dyn KeyValueStore>, keyring: Arc<Keyring>, space: &str) -> Self {
        PrivateStore {
            store,
            keyring,
            space: space.to_string(),
        }
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.get_with_metadata(key).await?.map(|entry| entry.value))
    }

    pub async fn get_with_metadata(&self, key: &str) -> StoreResult<Option<StoreEntry>> {
        let Some(entry) = self.store.get(&self.db_key(key)?).await? else {
            return Ok(None);
        };
        let decrypted = self.open(&entry.value)?;
        Ok(Some(StoreEntry {
            value: decrypted.value,
            timestamp: entry.timestamp,
        }))
    }

    pub async fn get_metadata(&self, key: &str) -> StoreResult<Option<EntryMetadata>> {
        self.store.get_metadata(&self.db_key(key)?).await
    }

    pub async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let db_key = self.db_key(key)?;
        let sealed = self.seal(key, value)?;
        self.store.set(&db_key, sealed).await
    }

    pub async fn set_multiple(&self, keys: &[String], values: Vec<Value>) -> StoreResult<()> {
        if keys.len() != values.len() {
            return Err(StoreError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        let mut entries = Vec::with_capacity(keys.len());
        for (key, value) in keys.iter().zip(values) {
            entries.push((self.db_key(key)?, self.seal(key, value)?));
        }
        self.store.set_multiple(entries).await
    }

    pub async fn remove(&self, key: &str) -> StoreResult<()> {
        self.store.remove(&self.db_key(key)?).await
    }

    /// Every private entry keyed by its plaintext key
    pub async fn all(&self) -> StoreResult<BTreeMap<String, Value>> {
        Ok(self
            .all_with_metadata()
            .await?
            .into_iter()
            .map(|(key, entry)| (key, entry.value))
            .collect())
    }

    pub async fn all_with_metadata(&self) -> StoreResult<BTreeMap<String, StoreEntry>> {
        let mut entries = BTreeMap::new();
        for (db_key, entry) in self.store.all().await? {
            if !is_private(&db_key) {
                continue;
            }
            let decrypted = self.open(&entry.value)?;
            entries.insert(
                decrypted.key,
                StoreEntry {
                    value: decrypted.value,
                    timestamp: entry.timestamp,
                },
            );
        }
        Ok(entries)
    }

    /// Private writes of the log with keys and values decrypted
    ///
    /// Deletions are omitted: they carry only the hashed key.
    pub async fn log(&self) -> StoreResult<Vec<LogEntry>> {
        let mut log = Vec::new();
        for entry in self.store.log().await? {
            if entry.op != LogOperation::Put || !is_private(&entry.key) {
                continue;
            }
            let Some(sealed) = &entry.value else {
                continue;
            };
            let decrypted = self.open(sealed)?;
            log.push(LogEntry {
                op: entry.op,
                key: decrypted.key,
                value: Some(decrypted.value),
                timestamp: entry.timestamp,
            });
        }
        Ok(log)
    }

    fn db_key(&self, key: &str) -> StoreResult<StoreKey> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey("key must not be empty".to_string()));
        }
        StoreKey::private(self.keyring.hash_db_key(key, &self.space))
    }

    fn seal(&self, key: &str, value: Value) -> StoreResult<Value> {
        let plaintext = serde_json::to_vec(&PrivateEntry {
            key: key.to_string(),
            value,
        })?;
        let envelope = self
            .keyring
            .encrypt(&plaintext)
            .map_err(|e| StoreError::Encryption(e.to_string()))?;
        Ok(serde_json::to_value(envelope)?)
    }

    fn open(&self, sealed: &Value) -> StoreResult<PrivateEntry> {
        let envelope: EncryptedEnvelope = serde_json::from_value(sealed.clone())
            .map_err(|e| StoreError::Decryption(format!("not an envelope: {}", e)))?;
        let plaintext = self
            .keyring
            .decrypt(&envelope)
            .map_err(|e| StoreError::Decryption(e.to_string()))?;
        record_counter(PRIVATE_DECRYPTIONS, 1);
        trace!(space = %self.space, "Decrypted private entry");
        serde_json::from_slice(&plaintext).map_err(|e| StoreError::Decryption(e.to_string()))
    }
}

fn is_private(db_key: &str) -> bool {
    StoreKey::parse(db_key).is_some_and(|key| key.partition() == Partition::Private)
}
