//! Content-addressed publication of identity documents
//!
//! The primary [`ContentStore`] must accept the document for publication to
//! succeed. The secondary [`PinningService`] mirror is best-effort.

use super::hashing::sha256_multihash;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Content store unavailable: {0}")]
    Unavailable(String),

    #[error("Publication rejected: {0}")]
    Rejected(String),
}

fn handle_poison<T>(_err: PoisonError<T>) -> PublishError {
    PublishError::Unavailable("Lock poisoned: a thread panicked while holding the lock".to_string())
}

/// Primary content-addressed storage
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes`, returning their content address
    async fn add(&self, bytes: Vec<u8>) -> Result<String, PublishError>;
}

/// Secondary pinning mirror
#[async_trait]
pub trait PinningService: Send + Sync {
    async fn pin(&self, bytes: Vec<u8>) -> Result<String, PublishError>;
}

/// In-memory content store addressing blobs by SHA-256 multihash
#[derive(Clone, Default)]
pub struct MemoryContentStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &str) -> Result<Option<Vec<u8>>, PublishError> {
        Ok(self.blobs.read().map_err(handle_poison)?.get(address).cloned())
    }

    pub fn len(&self) -> Result<usize, PublishError> {
        Ok(self.blobs.read().map_err(handle_poison)?.len())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn add(&self, bytes: Vec<u8>) -> Result<String, PublishError> {
        let address = sha256_multihash(&bytes);
        self.blobs
            .write()
            .map_err(handle_poison)?
            .insert(address.clone(), bytes);
        Ok(address)
    }
}

/// In-memory pinning mirror that can be switched into a failing state
#[derive(Clone, Default)]
pub struct MemoryPinningService {
    pinned: Arc<RwLock<Vec<String>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryPinningService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mirror whose every pin attempt fails
    pub fn failing() -> Self {
        let service = Self::default();
        service.failing.store(true, Ordering::SeqCst);
        service
    }

    pub fn pinned(&self) -> Vec<String> {
        self.pinned
            .read()
            .map(|pins| pins.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PinningService for MemoryPinningService {
    async fn pin(&self, bytes: Vec<u8>) -> Result<String, PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Unavailable("pinning node unreachable".to_string()));
        }
        let address = sha256_multihash(&bytes);
        self.pinned.write().map_err(handle_poison)?.push(address.clone());
        Ok(address)
    }
}
