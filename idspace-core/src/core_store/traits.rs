//! Store collaborator traits
//!
//! The log database, its key-value stores and the shared root index are
//! external. This crate only relies on the contracts below.

use super::errors::StoreResult;
use super::key::StoreKey;
use super::types::{EntryMetadata, IndexEntry, LogEntry, StoreEntry};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Address-addressable key-value store backed by a replicated log
///
/// Single-key operations are atomic. `set_multiple` gives no cross-key
/// atomicity beyond what the backend offers.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Open (or create) the store and return its address.
    ///
    /// Calling `load` again is a no-op returning the same address.
    async fn load(&self) -> StoreResult<String>;

    /// Address once loaded
    fn address(&self) -> Option<String>;

    /// Replicate history from peers.
    ///
    /// `expected_entries` is a hint from a prior session used to estimate
    /// completion.
    async fn sync(&self, expected_entries: Option<usize>) -> StoreResult<()>;

    async fn get(&self, key: &StoreKey) -> StoreResult<Option<StoreEntry>>;

    async fn get_metadata(&self, key: &StoreKey) -> StoreResult<Option<EntryMetadata>>;

    async fn set(&self, key: &StoreKey, value: Value) -> StoreResult<()>;

    async fn set_multiple(&self, entries: Vec<(StoreKey, Value)>) -> StoreResult<()>;

    /// Removing a missing key is not an error
    async fn remove(&self, key: &StoreKey) -> StoreResult<()>;

    /// Every current entry keyed by its stored (prefixed) key.
    ///
    /// Keys written by other clients need not belong to either partition.
    async fn all(&self) -> StoreResult<BTreeMap<String, StoreEntry>>;

    /// The full operation log, oldest first
    async fn log(&self) -> StoreResult<Vec<LogEntry>>;
}

/// Factory for named key-value stores
#[async_trait]
pub trait LogDatabase: Send + Sync {
    /// The store named `name`; repeated calls return the same store
    async fn key_value(&self, name: &str) -> StoreResult<Arc<dyn KeyValueStore>>;
}

/// Shared append-only index with one entry per space
#[async_trait]
pub trait RootIndex: Send + Sync {
    /// Entries oldest first. `limit` keeps only the newest `n`; `None` scans
    /// the whole index.
    async fn entries(&self, limit: Option<usize>) -> StoreResult<Vec<IndexEntry>>;

    /// Append a value, returning the new entry's hash
    async fn add(&self, value: Value) -> StoreResult<String>;

    async fn del(&self, hash: &str) -> StoreResult<()>;
}
