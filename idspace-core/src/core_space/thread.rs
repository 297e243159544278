//! Thread handles and the messaging backend seam
//!
//! Message transport and posting belong to the [`ThreadBackend`]. A space
//! only resolves addresses, loads threads and caches their handles.

use super::errors::{SpaceError, SpaceResult};
use super::subscription::SubscribedThread;
use crate::core_identity::hashing::sha256_multihash;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Options accepted when joining a thread
#[derive(Debug, Clone, Default)]
pub struct ThreadOptions {
    /// Defaults to the identity's DID
    pub first_moderator: Option<String>,
    /// Members-only thread
    pub members: bool,
    /// Do not subscribe automatically when posting
    pub no_auto_sub: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadConfig {
    pub name: String,
    #[serde(rename = "firstModerator")]
    pub first_moderator: String,
    pub members: bool,
    #[serde(rename = "noAutoSub")]
    pub no_auto_sub: bool,
}

/// A loaded thread
#[derive(Debug)]
pub struct ThreadHandle {
    address: String,
    store_name: String,
    config: ThreadConfig,
}

impl ThreadHandle {
    pub fn new(address: String, store_name: String, config: ThreadConfig) -> Self {
        ThreadHandle {
            address,
            store_name,
            config,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn config(&self) -> &ThreadConfig {
        &self.config
    }

    pub fn auto_subscribe(&self) -> bool {
        !self.config.no_auto_sub
    }

    /// Subscription record describing this thread
    pub fn subscription(&self) -> SubscribedThread {
        SubscribedThread::new(&self.address)
            .with_name(&self.config.name)
            .with_first_moderator(&self.config.first_moderator)
            .with_members(self.config.members)
    }
}

/// Pub/sub messaging engine
#[async_trait]
pub trait ThreadBackend: Send + Sync {
    /// Address the thread will have once loaded; depends on its access
    /// settings as well as its name
    async fn resolve_address(&self, store_name: &str, config: &ThreadConfig) -> SpaceResult<String>;

    /// Open the thread at `address` and start replicating it
    async fn load(&self, store_name: &str, config: &ThreadConfig, address: &str) -> SpaceResult<()>;
}

/// In-memory backend that counts loads per address
#[derive(Default)]
pub struct MemoryThreadBackend {
    loads: RwLock<HashMap<String, usize>>,
}

impl MemoryThreadBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_count(&self, address: &str) -> usize {
        self.loads
            .read()
            .map(|loads| loads.get(address).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_loads(&self) -> usize {
        self.loads
            .read()
            .map(|loads| loads.values().sum())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ThreadBackend for MemoryThreadBackend {
    async fn resolve_address(&self, store_name: &str, config: &ThreadConfig) -> SpaceResult<String> {
        let access = format!("{}|{}|{}", store_name, config.first_moderator, config.members);
        Ok(format!("/orbitdb/{}/{}", sha256_multihash(access.as_bytes()), store_name))
    }

    async fn load(&self, _store_name: &str, _config: &ThreadConfig, address: &str) -> SpaceResult<()> {
        let mut loads = self
            .loads
            .write()
            .map_err(|_| SpaceError::Thread("Lock poisoned".to_string()))?;
        *loads.entry(address.to_string()).or_insert(0) += 1;
        Ok(())
    }
}
