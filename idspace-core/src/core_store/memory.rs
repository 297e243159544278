//! In-memory log database, key-value stores and root index
//!
//! Process-local stand-ins for the replicated backends. Stores are shared
//! by name, so reopening a space sees the data written earlier.

use super::errors::{StoreError, StoreResult};
use super::key::StoreKey;
use super::traits::{KeyValueStore, LogDatabase, RootIndex};
use super::types::{
    now_millis, EntryMetadata, IndexEntry, IndexPayload, LogEntry, LogOperation, StoreEntry,
};
use crate::core_identity::hashing::sha256_multihash;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::debug;

fn handle_poison<T>(_err: PoisonError<T>) -> StoreError {
    StoreError::Storage("Lock poisoned: a thread panicked while holding the lock".to_string())
}

/// Sync behaviour handed to every store a database creates
#[derive(Debug, Clone, Default)]
struct SyncBehaviour {
    delay: Option<Duration>,
    failure: Option<String>,
}

/// In-memory [`LogDatabase`]
#[derive(Default)]
pub struct MemoryLogDatabase {
    stores: RwLock<HashMap<String, Arc<MemoryKeyValueStore>>>,
    sync: SyncBehaviour,
}

impl MemoryLogDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sync takes `delay` before completing
    pub fn with_sync_delay(mut self, delay: Duration) -> Self {
        self.sync.delay = Some(delay);
        self
    }

    /// Every sync fails with `reason`
    pub fn with_sync_failure(mut self, reason: &str) -> Self {
        self.sync.failure = Some(reason.to_string());
        self
    }

    /// Concrete store handle for inspection
    pub fn store(&self, name: &str) -> Option<Arc<MemoryKeyValueStore>> {
        self.stores.read().ok()?.get(name).cloned()
    }
}

#[async_trait]
impl LogDatabase for MemoryLogDatabase {
    async fn key_value(&self, name: &str) -> StoreResult<Arc<dyn KeyValueStore>> {
        let mut stores = self.stores.write().map_err(handle_poison)?;
        let store: Arc<dyn KeyValueStore> = stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryKeyValueStore::new(name, self.sync.clone())))
            .clone();
        Ok(store)
    }
}

#[derive(Default)]
struct KvState {
    loaded: bool,
    entries: BTreeMap<String, StoreEntry>,
    log: Vec<LogEntry>,
    sync_hints: Vec<Option<usize>>,
}

/// In-memory [`KeyValueStore`] addressed as `/orbitdb/<hash>/<name>`
pub struct MemoryKeyValueStore {
    name: String,
    address: String,
    state: RwLock<KvState>,
    sync: SyncBehaviour,
}

impl MemoryKeyValueStore {
    fn new(name: &str, sync: SyncBehaviour) -> Self {
        MemoryKeyValueStore {
            name: name.to_string(),
            address: format!("/orbitdb/{}/{}", sha256_multihash(name.as_bytes()), name),
            state: RwLock::new(KvState::default()),
            sync,
        }
    }

    /// Value stored under the prefixed key, bypassing any reducer
    pub fn raw_value(&self, db_key: &str) -> Option<Value> {
        let state = self.state.read().ok()?;
        state.entries.get(db_key).map(|e| e.value.clone())
    }

    /// Write under an arbitrary stored key, as a foreign client could
    pub fn insert_raw(&self, db_key: &str, value: Value) -> StoreResult<()> {
        let mut state = self.write_loaded()?;
        Self::put(&mut state, db_key.to_string(), value);
        Ok(())
    }

    /// Entry-count hints passed to each `sync` call
    pub fn sync_hints(&self) -> Vec<Option<usize>> {
        self.state
            .read()
            .map(|s| s.sync_hints.clone())
            .unwrap_or_default()
    }

    fn put(state: &mut KvState, db_key: String, value: Value) {
        let timestamp = now_millis();
        state.log.push(LogEntry {
            op: LogOperation::Put,
            key: db_key.clone(),
            value: Some(value.clone()),
            timestamp,
        });
        state.entries.insert(db_key, StoreEntry { value, timestamp });
    }

    fn read_loaded(&self) -> StoreResult<RwLockReadGuard<'_, KvState>> {
        let state = self.state.read().map_err(handle_poison)?;
        if !state.loaded {
            return Err(StoreError::NotLoaded(self.name.clone()));
        }
        Ok(state)
    }

    fn write_loaded(&self) -> StoreResult<RwLockWriteGuard<'_, KvState>> {
        let state = self.state.write().map_err(handle_poison)?;
        if !state.loaded {
            return Err(StoreError::NotLoaded(self.name.clone()));
        }
        Ok(state)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn load(&self) -> StoreResult<String> {
        self.state.write().map_err(handle_poison)?.loaded = true;
        Ok(self.address.clone())
    }

    fn address(&self) -> Option<String> {
        let loaded = self.state.read().map(|s| s.loaded).unwrap_or(false);
        loaded.then(|| self.address.clone())
    }

    async fn sync(&self, expected_entries: Option<usize>) -> StoreResult<()> {
        self.write_loaded()?.sync_hints.push(expected_entries);
        debug!(store = %self.name, ?expected_entries, "Syncing store");

        if let Some(delay) = self.sync.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.sync.failure {
            Some(reason) => Err(StoreError::Storage(reason.clone())),
            None => Ok(()),
        }
    }

    async fn get(&self, key: &StoreKey) -> StoreResult<Option<StoreEntry>> {
        Ok(self.read_loaded()?.entries.get(&key.to_db_key()).cloned())
    }

    async fn get_metadata(&self, key: &StoreKey) -> StoreResult<Option<EntryMetadata>> {
        Ok(self
            .read_loaded()?
            .entries
            .get(&key.to_db_key())
            .map(EntryMetadata::from))
    }

    async fn set(&self, key: &StoreKey, value: Value) -> StoreResult<()> {
        let mut state = self.write_loaded()?;
        Self::put(&mut state, key.to_db_key(), value);
        Ok(())
    }

    async fn set_multiple(&self, entries: Vec<(StoreKey, Value)>) -> StoreResult<()> {
        let mut state = self.write_loaded()?;
        for (key, value) in entries {
            Self::put(&mut state, key.to_db_key(), value);
        }
        Ok(())
    }

    async fn remove(&self, key: &StoreKey) -> StoreResult<()> {
        let mut state = self.write_loaded()?;
        let db_key = key.to_db_key();
        if state.entries.remove(&db_key).is_some() {
            state.log.push(LogEntry {
                op: LogOperation::Del,
                key: db_key,
                value: None,
                timestamp: now_millis(),
            });
        }
        Ok(())
    }

    async fn all(&self) -> StoreResult<BTreeMap<String, StoreEntry>> {
        Ok(self.read_loaded()?.entries.clone())
    }

    async fn log(&self) -> StoreResult<Vec<LogEntry>> {
        Ok(self.read_loaded()?.log.clone())
    }
}

/// In-memory [`RootIndex`] with hash-addressed entries
#[derive(Default)]
pub struct MemoryRootIndex {
    entries: RwLock<Vec<IndexEntry>>,
    next_seq: AtomicU64,
}

impl MemoryRootIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current values, oldest first
    pub fn values(&self) -> Vec<Value> {
        self.entries
            .read()
            .map(|entries| entries.iter().map(|e| e.payload.value.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RootIndex for MemoryRootIndex {
    async fn entries(&self, limit: Option<usize>) -> StoreResult<Vec<IndexEntry>> {
        let entries = self.entries.read().map_err(handle_poison)?;
        let skip = limit.map_or(0, |n| entries.len().saturating_sub(n));
        Ok(entries[skip..].to_vec())
    }

    async fn add(&self, value: Value) -> StoreResult<String> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let hash = sha256_multihash(format!("{}:{}", seq, value).as_bytes());
        self.entries.write().map_err(handle_poison)?.push(IndexEntry {
            hash: hash.clone(),
            payload: IndexPayload { value },
        });
        Ok(hash)
    }

    async fn del(&self, hash: &str) -> StoreResult<()> {
        self.entries
            .write()
            .map_err(handle_poison)?
            .retain(|entry| entry.hash != hash);
        Ok(())
    }
}
