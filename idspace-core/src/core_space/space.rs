//! Space orchestrator
//!
//! A space binds an identity's per-space keyring to one key-value store,
//! registers that store in the shared root index, and keeps its thread
//! subscriptions as public entries.
//!
//! Opening is idempotent. The store sync started by [`Space::open`] runs in
//! the background; reads issued before it completes may miss history, so
//! callers that need a full snapshot await [`Space::wait_for_sync`].

use super::address::{space_store_name, thread_store_name, StoreAddress};
use super::errors::{SpaceError, SpaceResult};
use super::root_index::reconcile;
use super::subscription::{parse_subscription, subscription_key, SubscribedThread};
use super::thread::{ThreadBackend, ThreadConfig, ThreadHandle, ThreadOptions};
use crate::config::SpaceConfig;
use crate::core_identity::{IdentityCore, IdentityError};
use crate::core_store::{KeyValueStore, LogDatabase, PrivateStore, PublicStore, RootIndex, StoreError};
use crate::metrics::{record_counter, Timer, SPACE_OPEN_DURATION, THREADS_JOINED};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, OnceCell};
use tracing::{debug, info, warn};

/// Observer told whether opening required fresh consent, and for which space
pub type SpaceConsentCallback = Box<dyn Fn(bool, &str) + Send + Sync>;

/// Invoked once the background sync completes successfully
pub type SyncDoneCallback = Box<dyn FnOnce() + Send>;

/// External collaborators a space needs
#[derive(Clone)]
pub struct SpaceServices {
    pub db: Arc<dyn LogDatabase>,
    pub root_index: Arc<dyn RootIndex>,
    pub threads: Arc<dyn ThreadBackend>,
    /// Root index entries scanned during reconciliation; `None` scans all
    pub root_index_limit: Option<usize>,
    /// Bound on [`Space::wait_for_sync`]; `None` waits indefinitely
    pub sync_timeout: Option<Duration>,
}

impl SpaceServices {
    pub fn new(
        db: Arc<dyn LogDatabase>,
        root_index: Arc<dyn RootIndex>,
        threads: Arc<dyn ThreadBackend>,
    ) -> Self {
        SpaceServices {
            db,
            root_index,
            threads,
            root_index_limit: None,
            sync_timeout: None,
        }
    }

    /// Apply the `[space]` config section
    pub fn with_config(mut self, config: &SpaceConfig) -> Self {
        self.root_index_limit = config.root_index_limit;
        self.sync_timeout = Some(config.sync_timeout);
        self
    }
}

#[derive(Default)]
pub struct OpenOptions {
    pub consent_callback: Option<SpaceConsentCallback>,
    /// Entry counts from a previous session, keyed by store address
    pub num_entries_messages: HashMap<String, usize>,
    pub on_sync_done: Option<SyncDoneCallback>,
}

/// Progress of the background store sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Pending,
    Done,
    Failed(String),
}

struct OpenedSpace {
    address: String,
    public: PublicStore,
    private: PrivateStore,
}

pub struct Space {
    name: String,
    identity: Arc<IdentityCore>,
    services: SpaceServices,
    opened: OnceCell<OpenedSpace>,
    sync_tx: Arc<watch::Sender<SyncState>>,
    sync_rx: watch::Receiver<SyncState>,
    /// Loaded threads keyed by resolved address
    active_threads: Mutex<HashMap<String, Arc<ThreadHandle>>>,
}

impl Space {
    pub fn new(name: &str, identity: Arc<IdentityCore>, services: SpaceServices) -> Self {
        let (sync_tx, sync_rx) = watch::channel(SyncState::Pending);
        Space {
            name: name.to_string(),
            identity,
            services,
            opened: OnceCell::new(),
            sync_tx: Arc::new(sync_tx),
            sync_rx,
            active_threads: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// DID acting in this space
    pub fn did(&self) -> Option<&str> {
        self.identity.did().map(|did| did.as_str())
    }

    pub fn is_open(&self) -> bool {
        self.opened.initialized()
    }

    /// Store address, once open
    pub fn address(&self) -> Option<&str> {
        self.opened.get().map(|opened| opened.address.as_str())
    }

    /// Open the space; a no-op when already open
    ///
    /// Derives the space keyring (asking for consent if needed), loads the
    /// store, reconciles the root index and starts the background sync.
    pub async fn open(&self, opts: OpenOptions) -> SpaceResult<()> {
        self.opened.get_or_try_init(|| self.open_inner(opts)).await?;
        Ok(())
    }

    async fn open_inner(&self, opts: OpenOptions) -> SpaceResult<OpenedSpace> {
        let timer = Timer::new(SPACE_OPEN_DURATION);

        let consent = self.identity.init_keyring_by_name(&self.name).await?;
        if let Some(cb) = &opts.consent_callback {
            cb(consent, &self.name);
        }
        let keyring = self
            .identity
            .space_keyring(&self.name)?
            .ok_or_else(|| IdentityError::UnknownSpace(self.name.clone()))?;

        let store_name = space_store_name(&self.name);
        let store = self.services.db.key_value(&store_name).await?;
        let address = store.load().await?;

        let did = self.identity.did().ok_or(IdentityError::NotPublished)?;
        reconcile(
            self.services.root_index.as_ref(),
            &store_name,
            did.as_str(),
            &address,
            self.services.root_index_limit,
        )
        .await?;

        let expected = opts.num_entries_messages.get(&address).copied();
        self.start_sync(store.clone(), expected, opts.on_sync_done);

        info!(space = %self.name, address = %address, consent, "Opened space");
        timer.stop();

        Ok(OpenedSpace {
            address,
            public: PublicStore::new(store.clone()),
            private: PrivateStore::new(store, keyring, &self.name),
        })
    }

    fn start_sync(
        &self,
        store: Arc<dyn KeyValueStore>,
        expected: Option<usize>,
        on_done: Option<SyncDoneCallback>,
    ) {
        let tx = self.sync_tx.clone();
        let space = self.name.clone();
        debug!(space = %space, ?expected, "Starting space sync");

        tokio::spawn(async move {
            match store.sync(expected).await {
                Ok(()) => {
                    debug!(space = %space, "Space sync done");
                    tx.send_replace(SyncState::Done);
                    if let Some(cb) = on_done {
                        cb();
                    }
                }
                Err(e) => {
                    warn!(space = %space, error = %e, "Space sync failed");
                    tx.send_replace(SyncState::Failed(e.to_string()));
                }
            }
        });
    }

    /// Wait for the sync started by [`Space::open`]
    pub async fn wait_for_sync(&self) -> SpaceResult<()> {
        if !self.is_open() {
            return Err(SpaceError::NotOpen(self.name.clone()));
        }

        let mut rx = self.sync_rx.clone();
        let wait = rx.wait_for(|state| *state != SyncState::Pending);
        let state = match self.services.sync_timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| SpaceError::Sync(format!("timed out after {:?}", limit)))?,
            None => wait.await,
        }
        .map_err(|_| SpaceError::Sync("sync task went away".to_string()))?
        .clone();

        match state {
            SyncState::Failed(reason) => Err(SpaceError::Sync(reason)),
            _ => Ok(()),
        }
    }

    /// Current sync progress
    pub fn sync_state(&self) -> SyncState {
        self.sync_rx.borrow().clone()
    }

    pub fn public(&self) -> SpaceResult<&PublicStore> {
        self.opened
            .get()
            .map(|opened| &opened.public)
            .ok_or_else(|| SpaceError::NotOpen(self.name.clone()))
    }

    pub fn private(&self) -> SpaceResult<&PrivateStore> {
        self.opened
            .get()
            .map(|opened| &opened.private)
            .ok_or_else(|| SpaceError::NotOpen(self.name.clone()))
    }

    /// Join thread `name` of this space
    pub async fn join_thread(&self, name: &str, opts: ThreadOptions) -> SpaceResult<Arc<ThreadHandle>> {
        let config = self.thread_config(name, opts)?;
        let store_name = thread_store_name(&self.name, name);
        let address = self
            .services
            .threads
            .resolve_address(&store_name, &config)
            .await?;
        self.load_thread(address, store_name, config).await
    }

    /// Join a thread by its full store address
    ///
    /// The address must be well-formed and name a thread of this space.
    pub async fn join_thread_by_address(
        &self,
        address: &str,
        opts: ThreadOptions,
    ) -> SpaceResult<Arc<ThreadHandle>> {
        let parsed = StoreAddress::parse(address)?;
        let (space, thread) = parsed
            .thread_segments()
            .ok_or_else(|| SpaceError::InvalidAddress(address.to_string()))?;
        if space != self.name {
            return Err(SpaceError::CrossSpace {
                expected: self.name.clone(),
                actual: space.to_string(),
            });
        }

        let config = self.thread_config(thread, opts)?;
        let store_name = thread_store_name(&self.name, thread);
        self.load_thread(address.to_string(), store_name, config).await
    }

    async fn load_thread(
        &self,
        address: String,
        store_name: String,
        config: ThreadConfig,
    ) -> SpaceResult<Arc<ThreadHandle>> {
        let mut active = self.active_threads.lock().await;
        if let Some(handle) = active.get(&address) {
            return Ok(handle.clone());
        }

        self.services
            .threads
            .load(&store_name, &config, &address)
            .await?;
        let handle = Arc::new(ThreadHandle::new(address.clone(), store_name, config));
        active.insert(address, handle.clone());
        record_counter(THREADS_JOINED, 1);
        debug!(space = %self.name, thread = %handle.name(), "Joined thread");
        Ok(handle)
    }

    fn thread_config(&self, name: &str, opts: ThreadOptions) -> SpaceResult<ThreadConfig> {
        let first_moderator = match opts.first_moderator {
            Some(did) => did,
            None => self
                .did()
                .ok_or(IdentityError::NotPublished)?
                .to_string(),
        };
        Ok(ThreadConfig {
            name: name.to_string(),
            first_moderator,
            members: opts.members,
            no_auto_sub: opts.no_auto_sub,
        })
    }

    /// Record a subscription unless one exists
    ///
    /// Waits for the space sync first so an existing record is seen.
    pub async fn subscribe_thread(&self, thread: SubscribedThread) -> SpaceResult<()> {
        StoreAddress::parse(&thread.address)?;
        self.wait_for_sync().await?;

        let public = self.public()?;
        let key = subscription_key(&thread.address);
        if public.get(&key).await?.is_none() {
            let value = serde_json::to_value(&thread).map_err(StoreError::from)?;
            public.set(&key, value).await?;
            info!(space = %self.name, address = %thread.address, "Subscribed to thread");
        }
        Ok(())
    }

    /// Remove a subscription if present
    pub async fn unsubscribe_thread(&self, address: &str) -> SpaceResult<()> {
        let public = self.public()?;
        let key = subscription_key(address);
        if public.get(&key).await?.is_some() {
            public.remove(&key).await?;
            info!(space = %self.name, address, "Unsubscribed from thread");
        }
        Ok(())
    }

    /// All subscriptions, skipping malformed entries
    pub async fn subscribed_threads(&self) -> SpaceResult<Vec<SubscribedThread>> {
        Ok(self
            .public()?
            .all()
            .await?
            .iter()
            .filter_map(|(key, value)| parse_subscription(key, value))
            .collect())
    }

    /// Handles currently cached, keyed by address
    pub async fn active_threads(&self) -> Vec<Arc<ThreadHandle>> {
        self.active_threads.lock().await.values().cloned().collect()
    }
}

impl fmt::Debug for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Space")
            .field("name", &self.name)
            .field("address", &self.address())
            .field("sync", &*self.sync_rx.borrow())
            .finish()
    }
}
