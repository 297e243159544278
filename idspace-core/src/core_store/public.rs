//! Public partition view
//!
//! Plain keys and values; only entries stored under the public partition
//! are visible here.

use super::errors::{StoreError, StoreResult};
use super::key::{Partition, StoreKey};
use super::traits::KeyValueStore;
use super::types::{EntryMetadata, LogEntry, StoreEntry};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct PublicStore {
    store: Arc<dyn KeyValueStore>,
}

impl PublicStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        PublicStore { store }
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.get_with_metadata(key).await?.map(|entry| entry.value))
    }

    pub async fn get_with_metadata(&self, key: &str) -> StoreResult<Option<StoreEntry>> {
        self.store.get(&StoreKey::public(key)?).await
    }

    pub async fn get_metadata(&self, key: &str) -> StoreResult<Option<EntryMetadata>> {
        self.store.get_metadata(&StoreKey::public(key)?).await
    }

    pub async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.store.set(&StoreKey::public(key)?, value).await
    }

    pub async fn set_multiple(&self, keys: &[String], values: Vec<Value>) -> StoreResult<()> {
        if keys.len() != values.len() {
            return Err(StoreError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        let entries = keys
            .iter()
            .map(StoreKey::public)
            .zip(values)
            .map(|(key, value)| key.map(|k| (k, value)))
            .collect::<StoreResult<Vec<_>>>()?;
        self.store.set_multiple(entries).await
    }

    pub async fn remove(&self, key: &str) -> StoreResult<()> {
        self.store.remove(&StoreKey::public(key)?).await
    }

    pub async fn all(&self) -> StoreResult<BTreeMap<String, Value>> {
        Ok(self
            .all_with_metadata()
            .await?
            .into_iter()
            .map(|(key, entry)| (key, entry.value))
            .collect())
    }

    pub async fn all_with_metadata(&self) -> StoreResult<BTreeMap<String, StoreEntry>> {
        Ok(self
            .store
            .all()
            .await?
            .into_iter()
            .filter_map(|(db_key, entry)| public_key(&db_key).map(|key| (key, entry)))
            .collect())
    }

    /// Public operations of the log, keys stripped of their prefix
    pub async fn log(&self) -> StoreResult<Vec<LogEntry>> {
        Ok(self
            .store
            .log()
            .await?
            .into_iter()
            .filter_map(|mut entry| {
                entry.key = public_key(&entry.key)?;
                Some(entry)
            })
            .collect())
    }
}

fn public_key(db_key: &str) -> Option<String> {
    StoreKey::parse(db_key)
        .filter(|key| key.partition() == Partition::Public)
        .map(|key| key.raw().to_string())
}
