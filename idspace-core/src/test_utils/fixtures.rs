//! Test fixtures for identities, stores and their collaborators

use crate::core_identity::*;
use crate::core_space::{MemoryThreadBackend, OpenOptions, Space, SpaceServices};
use crate::core_store::{
    KeyValueStore, LogDatabase, MemoryKeyValueStore, MemoryLogDatabase, MemoryRootIndex,
    PrivateStore, PublicStore,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mixed-case on purpose so normalization is exercised
pub const TEST_ADDRESS: &str = "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01";
pub const TEST_WALLET_KEY: [u8; 32] = [7u8; 32];

/// Wallet signer that records every consent request it serves
pub struct CountingAuthorizer {
    wallet: WalletSigner,
    requests: Mutex<Vec<ConsentRequest>>,
}

impl CountingAuthorizer {
    pub fn new(address: &str, key: [u8; 32]) -> Self {
        Self {
            wallet: WalletSigner::new(address, key),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ConsentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Authorizer for CountingAuthorizer {
    async fn request_consent(&self, request: &ConsentRequest) -> Result<Vec<u8>, AuthError> {
        self.requests.lock().unwrap().push(request.clone());
        self.wallet.request_consent(request).await
    }
}

/// Authorizer standing in for a user who always clicks "reject"
pub struct DenyingAuthorizer;

#[async_trait]
impl Authorizer for DenyingAuthorizer {
    async fn request_consent(&self, _request: &ConsentRequest) -> Result<Vec<u8>, AuthError> {
        Err(AuthError::Denied)
    }
}

/// Delegated auth flow handing back a fixed seed
pub struct StaticSeedDelegate {
    seed: KeyringSeed,
}

impl StaticSeedDelegate {
    pub fn new(fill: u8) -> Self {
        Self {
            seed: KeyringSeed::from_bytes(vec![fill; 64]).unwrap(),
        }
    }
}

#[async_trait]
impl AuthDelegate for StaticSeedDelegate {
    async fn authenticate(&self) -> Result<KeyringSeed, AuthError> {
        Ok(self.seed.clone())
    }
}

/// Primary content store that is always down
pub struct FailingContentStore;

#[async_trait]
impl ContentStore for FailingContentStore {
    async fn add(&self, _bytes: Vec<u8>) -> Result<String, PublishError> {
        Err(PublishError::Unavailable("content node unreachable".to_string()))
    }
}

/// In-memory storage whose next `n` saves fail with a disk error
#[derive(Clone, Default)]
pub struct FlakyStorage {
    inner: MemoryIdentityStorage,
    failing_saves: Arc<AtomicUsize>,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_saves(&self, n: usize) {
        self.failing_saves.store(n, Ordering::SeqCst);
    }
}

impl IdentityStorage for FlakyStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let failing = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(StorageError::Other("disk full".to_string()));
        }
        self.inner.save(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

/// Shared in-memory collaborators for identity tests
///
/// Clones share state, so a second bootstrap from the same environment
/// sees what the first one persisted.
#[derive(Clone)]
pub struct TestIdentityEnv {
    pub storage: MemoryIdentityStorage,
    pub content: MemoryContentStore,
    pub pinning: MemoryPinningService,
    pub authorizer: Arc<CountingAuthorizer>,
}

impl TestIdentityEnv {
    pub fn new() -> Self {
        Self::with_wallet(TEST_WALLET_KEY)
    }

    pub fn with_wallet(key: [u8; 32]) -> Self {
        Self {
            storage: MemoryIdentityStorage::new(),
            content: MemoryContentStore::new(),
            pinning: MemoryPinningService::new(),
            authorizer: Arc::new(CountingAuthorizer::new(TEST_ADDRESS, key)),
        }
    }

    pub fn services(&self) -> IdentityServices {
        self.services_with_storage(Arc::new(self.storage.clone()))
    }

    /// Services backed by `storage` instead of the shared in-memory one
    pub fn services_with_storage(&self, storage: Arc<dyn IdentityStorage>) -> IdentityServices {
        IdentityServices::new(storage, Arc::new(self.content.clone()))
            .with_pinning(Arc::new(self.pinning.clone()))
    }

    /// Bootstrap from [`TEST_ADDRESS`], reusing any persisted record
    pub async fn bootstrap(&self) -> IdentityCore {
        IdentityCore::get_id_from_eth_address(
            TEST_ADDRESS,
            self.authorizer.clone(),
            self.services(),
            BootstrapOptions::default(),
        )
        .await
        .expect("bootstrap should succeed")
    }
}

impl Default for TestIdentityEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Keyring from a fixed seed pattern
pub fn test_keyring(fill: u8) -> Arc<Keyring> {
    Arc::new(Keyring::new(KeyringSeed::from_bytes(vec![fill; 64]).unwrap()).unwrap())
}

/// Both partition views over one loaded in-memory store
pub struct TestStoreEnv {
    pub raw: Arc<MemoryKeyValueStore>,
    pub public: PublicStore,
    pub private: PrivateStore,
}

impl TestStoreEnv {
    pub async fn new(space: &str) -> Self {
        Self::with_keyring(space, test_keyring(1)).await
    }

    pub async fn with_keyring(space: &str, keyring: Arc<Keyring>) -> Self {
        let name = format!("3box.space.{}.keyvalue", space);
        let db = MemoryLogDatabase::new();
        let store = db.key_value(&name).await.unwrap();
        store.load().await.unwrap();
        Self {
            raw: db.store(&name).unwrap(),
            public: PublicStore::new(store.clone()),
            private: PrivateStore::new(store, keyring, space),
        }
    }
}

/// A published identity plus in-memory space collaborators
pub struct TestSpaceEnv {
    pub identity_env: TestIdentityEnv,
    pub identity: Arc<IdentityCore>,
    pub db: Arc<MemoryLogDatabase>,
    pub root_index: Arc<MemoryRootIndex>,
    pub threads: Arc<MemoryThreadBackend>,
}

impl TestSpaceEnv {
    pub async fn new() -> Self {
        Self::with_database(MemoryLogDatabase::new()).await
    }

    pub async fn with_database(db: MemoryLogDatabase) -> Self {
        let identity_env = TestIdentityEnv::new();
        let identity = Arc::new(identity_env.bootstrap().await);
        Self {
            identity_env,
            identity,
            db: Arc::new(db),
            root_index: Arc::new(MemoryRootIndex::new()),
            threads: Arc::new(MemoryThreadBackend::new()),
        }
    }

    pub fn services(&self) -> SpaceServices {
        SpaceServices::new(self.db.clone(), self.root_index.clone(), self.threads.clone())
    }

    pub fn space(&self, name: &str) -> Space {
        Space::new(name, self.identity.clone(), self.services())
    }

    /// Open `name` and wait for its sync
    pub async fn open_space(&self, name: &str) -> Space {
        let space = self.space(name);
        space.open(OpenOptions::default()).await.unwrap();
        space.wait_for_sync().await.unwrap();
        space
    }

    /// A valid thread address inside space `space`
    pub fn thread_address(space: &str, thread: &str) -> String {
        let name = format!("3box.thread.{}.{}", space, thread);
        format!("/orbitdb/{}/{}", hashing::sha256_multihash(name.as_bytes()), name)
    }
}
