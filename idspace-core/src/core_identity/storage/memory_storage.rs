//! In-memory identity storage for testing

use super::{IdentityStorage, StorageError};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

fn handle_poison<T>(_err: PoisonError<T>) -> StorageError {
    StorageError::Other("Lock poisoned: a thread panicked while holding the lock".to_string())
}

/// In-memory storage (non-persistent, for tests)
#[derive(Clone, Default)]
pub struct MemoryIdentityStorage {
    records: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryIdentityStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.records.read().map_err(handle_poison)?.keys().cloned().collect())
    }
}

impl IdentityStorage for MemoryIdentityStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.records.read().map_err(handle_poison)?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.records
            .write()
            .map_err(handle_poison)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.records.write().map_err(handle_poison)?.remove(key);
        Ok(())
    }
}
