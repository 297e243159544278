//! Identity core
//!
//! Owns the main keyring plus one keyring per opened space, publishes the
//! identity document to obtain a DID, and persists its full state as a
//! single [`IdentityRecord`] keyed by the normalized management address.
//!
//! Space keyrings are only ever derived after the user signs a space-scoped
//! consent message (see [`IdentityCore::init_keyring_by_name`]).

use super::auth::{AuthDelegate, AuthError, Authorizer, ConsentRequest};
use super::document::{Did, IdentityDocument, DEFAULT_DID_METHOD};
use super::encryption::EncryptedEnvelope;
use super::errors::{IdentityError, IdentityResult};
use super::jwt::create_jwt;
use super::keyring::Keyring;
use super::publish::{ContentStore, PinningService, PublishError};
use super::record::{normalize_address, IdentityRecord};
use super::seed::KeyringSeed;
use super::storage::{IdentityStorage, StorageError};
use crate::config::{IdentityConfig, PinningConfig, DEFAULT_STORAGE_KEY_PREFIX};
use crate::metrics::{
    record_counter, CONSENT_REQUESTS, KEYRINGS_DERIVED, PIN_FAILURES, PUBLICATIONS,
};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Observer told whether fresh user authorization took place
pub type ConsentCallback = Box<dyn Fn(bool) + Send + Sync>;

fn handle_poison<T>(_err: PoisonError<T>) -> IdentityError {
    IdentityError::Storage(StorageError::Other(
        "Lock poisoned: a thread panicked while holding the lock".to_string(),
    ))
}

/// External collaborators an identity needs
#[derive(Clone)]
pub struct IdentityServices {
    pub storage: Arc<dyn IdentityStorage>,
    pub content: Arc<dyn ContentStore>,
    pub pinning: Option<Arc<dyn PinningService>>,
    /// Bound on one background pin attempt
    pub pin_timeout: Option<Duration>,
    pub storage_key_prefix: String,
    pub did_method: String,
}

impl IdentityServices {
    pub fn new(storage: Arc<dyn IdentityStorage>, content: Arc<dyn ContentStore>) -> Self {
        IdentityServices {
            storage,
            content,
            pinning: None,
            pin_timeout: None,
            storage_key_prefix: DEFAULT_STORAGE_KEY_PREFIX.to_string(),
            did_method: DEFAULT_DID_METHOD.to_string(),
        }
    }

    pub fn with_pinning(mut self, pinning: Arc<dyn PinningService>) -> Self {
        self.pinning = Some(pinning);
        self
    }

    /// Attach `pinning` as the mirror unless the `[pinning]` section disables it
    pub fn with_pinning_config(
        mut self,
        pinning: Arc<dyn PinningService>,
        config: &PinningConfig,
    ) -> Self {
        if config.enabled {
            self.pinning = Some(pinning);
            self.pin_timeout = Some(config.timeout);
        }
        self
    }

    /// Apply the `[identity]` config section
    pub fn with_config(mut self, config: &IdentityConfig) -> Self {
        self.storage_key_prefix = config.storage_key_prefix.clone();
        self.did_method = config.did_method.clone();
        self
    }

    /// Storage key for an address (normalized here)
    pub fn storage_key(&self, address: &str) -> String {
        format!("{}{}", self.storage_key_prefix, normalize_address(address))
    }
}

/// Options for the address-based bootstrap
#[derive(Default)]
pub struct BootstrapOptions {
    pub consent_callback: Option<ConsentCallback>,
}

pub struct IdentityCore {
    management_address: Option<String>,
    main_keyring: Arc<Keyring>,
    keyrings: RwLock<HashMap<String, Arc<Keyring>>>,
    /// Serializes space consent so each space is derived at most once
    consent_gate: Mutex<()>,
    authorizer: Option<Arc<dyn Authorizer>>,
    services: IdentityServices,
    did: Option<Did>,
}

impl IdentityCore {
    /// Construct from a serialized identity record
    ///
    /// The DID is not available until [`IdentityCore::publish`] has run.
    /// A record carrying a management address is persisted immediately.
    pub fn from_state(
        serialized: &str,
        services: IdentityServices,
        authorizer: Option<Arc<dyn Authorizer>>,
    ) -> IdentityResult<Self> {
        let record = IdentityRecord::parse(serialized)?;

        let main_keyring = Arc::new(Keyring::new(record.seed)?);
        let mut keyrings = HashMap::with_capacity(record.space_seeds.len());
        for (name, seed) in record.space_seeds {
            keyrings.insert(name, Arc::new(Keyring::new(seed)?));
        }

        let identity = IdentityCore {
            management_address: record.management_address,
            main_keyring,
            keyrings: RwLock::new(keyrings),
            consent_gate: Mutex::new(()),
            authorizer,
            services,
            did: None,
        };
        identity.persist()?;
        Ok(identity)
    }

    /// Construct from a serialized record and publish its document
    pub async fn restore(
        serialized: &str,
        services: IdentityServices,
        authorizer: Option<Arc<dyn Authorizer>>,
    ) -> IdentityResult<Self> {
        let mut identity = Self::from_state(serialized, services, authorizer)?;
        identity.publish().await?;
        Ok(identity)
    }

    /// Address-based bootstrap
    ///
    /// Reuses the persisted record for `address` when one exists; otherwise
    /// asks `authorizer` for exactly one consent signature and derives a
    /// fresh main keyring from it.
    pub async fn get_id_from_eth_address(
        address: &str,
        authorizer: Arc<dyn Authorizer>,
        services: IdentityServices,
        opts: BootstrapOptions,
    ) -> IdentityResult<Self> {
        let normalized = normalize_address(address);
        let key = services.storage_key(&normalized);

        let serialized = match services.storage.load(&key)? {
            Some(existing) if !existing.is_empty() => {
                debug!(address = %normalized, "Restoring persisted identity");
                if let Some(cb) = &opts.consent_callback {
                    cb(false);
                }
                existing
            }
            _ => {
                info!(address = %normalized, "Requesting identity consent");
                record_counter(CONSENT_REQUESTS, 1);
                let signature = authorizer
                    .request_consent(&ConsentRequest::identity(&normalized))
                    .await?;
                if let Some(cb) = &opts.consent_callback {
                    cb(true);
                }
                let seed = KeyringSeed::from_signature(&signature)?;
                record_counter(KEYRINGS_DERIVED, 1);
                IdentityRecord::new(Some(normalized.clone()), seed).to_json()?
            }
        };

        Self::restore(&serialized, services, Some(authorizer)).await
    }

    /// Delegated bootstrap through an interactive authentication flow
    ///
    /// The resulting identity has no management address and is not persisted
    /// locally; the delegate governs its own caching.
    pub async fn get_id_from_auth(
        delegate: &dyn AuthDelegate,
        services: IdentityServices,
        authorizer: Option<Arc<dyn Authorizer>>,
    ) -> IdentityResult<Self> {
        info!("Waiting for delegated authentication");
        let seed = delegate.authenticate().await?;
        let serialized = IdentityRecord::new(None, seed).to_json()?;
        Self::restore(&serialized, services, authorizer).await
    }

    /// Whether a persisted record exists for `address`
    pub fn is_logged_in(services: &IdentityServices, address: &str) -> IdentityResult<bool> {
        let stored = services.storage.load(&services.storage_key(address))?;
        Ok(stored.map(|s| !s.is_empty()).unwrap_or(false))
    }

    /// Publish the identity document and derive the DID
    ///
    /// Only the primary content store write must succeed. The pinning mirror
    /// runs in the background and its failures are logged, never returned.
    pub async fn publish(&mut self) -> IdentityResult<&Did> {
        let document = IdentityDocument::new(
            self.main_keyring.public_keys(),
            self.management_address.as_deref(),
        );
        let bytes = document.to_bytes()?;

        let address = self.services.content.add(bytes.clone()).await?;
        let did = Did::new(&self.services.did_method, &address);
        info!(did = %did, "Published identity document");
        record_counter(PUBLICATIONS, 1);

        if let Some(pinning) = self.services.pinning.clone() {
            let did_str = did.to_string();
            let limit = self.services.pin_timeout;
            tokio::spawn(async move {
                let attempt = pinning.pin(bytes);
                let result = match limit {
                    Some(limit) => tokio::time::timeout(limit, attempt).await.unwrap_or_else(|_| {
                        Err(PublishError::Unavailable(format!("pin timed out after {:?}", limit)))
                    }),
                    None => attempt.await,
                };
                match result {
                    Ok(pin) => debug!(did = %did_str, pin = %pin, "Pinned identity document"),
                    Err(e) => {
                        warn!(did = %did_str, error = %e, "Secondary pin of identity document failed");
                        record_counter(PIN_FAILURES, 1);
                    }
                }
            });
        }

        Ok(&*self.did.insert(did))
    }

    pub fn did(&self) -> Option<&Did> {
        self.did.as_ref()
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.did.as_ref().map(Did::fingerprint)
    }

    pub fn management_address(&self) -> Option<&str> {
        self.management_address.as_deref()
    }

    pub fn main_keyring(&self) -> &Arc<Keyring> {
        &self.main_keyring
    }

    /// Keyring of an opened space
    pub fn space_keyring(&self, space: &str) -> IdentityResult<Option<Arc<Keyring>>> {
        Ok(self.read_keyrings()?.get(space).cloned())
    }

    /// Names of all spaces with a derived keyring, sorted
    pub fn space_names(&self) -> IdentityResult<Vec<String>> {
        let mut names: Vec<String> = self.read_keyrings()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Resolve a compound `.`-separated name to a keyring
    ///
    /// A first segment equal to the identity fingerprint selects the main
    /// keyring; otherwise the third segment names the space. Unknown names
    /// resolve to `None`.
    pub fn keyring_by_space_name(&self, name: &str) -> Option<Arc<Keyring>> {
        let segments: Vec<&str> = name.split('.').collect();
        if self.fingerprint().is_some() && segments.first().copied() == self.fingerprint() {
            return Some(self.main_keyring.clone());
        }
        let space = segments.get(2)?;
        self.keyrings.read().ok()?.get(*space).cloned()
    }

    /// Derive the keyring for `name` behind a space-scoped consent
    ///
    /// Returns `true` when consent was requested and a keyring derived,
    /// `false` when the space already had one.
    pub async fn init_keyring_by_name(&self, name: &str) -> IdentityResult<bool> {
        let _gate = self.consent_gate.lock().await;
        if self.has_keyring(name)? {
            return Ok(false);
        }

        let authorizer = self.authorizer.as_ref().ok_or(AuthError::Unavailable)?;
        info!(space = name, "Requesting space consent");
        record_counter(CONSENT_REQUESTS, 1);
        let request = ConsentRequest::space(self.management_address.as_deref(), name);
        let signature = authorizer.request_consent(&request).await?;

        let seed = KeyringSeed::from_signature(&signature)?;
        let keyring = Arc::new(Keyring::new(seed.clone())?);

        // The keyring only becomes visible once the record carrying it is saved
        let mut record = self.to_record()?;
        record.space_seeds.insert(name.to_string(), seed);
        self.persist_record(&record)?;

        self.write_keyrings()?.insert(name.to_string(), keyring);
        record_counter(KEYRINGS_DERIVED, 1);
        Ok(true)
    }

    /// Sign a JWT with the main keyring, issued by the DID
    pub fn sign_jwt(&self, payload: Value) -> IdentityResult<String> {
        let did = self.did.as_ref().ok_or(IdentityError::NotPublished)?;
        create_jwt(payload, &self.main_keyring.jwt_signer(), did.as_str())
    }

    /// Encrypt with the space keyring, or the main keyring when `space` is `None`
    pub fn encrypt(&self, message: &[u8], space: Option<&str>) -> IdentityResult<EncryptedEnvelope> {
        self.keyring_for(space)?.encrypt(message)
    }

    pub fn decrypt(&self, envelope: &EncryptedEnvelope, space: Option<&str>) -> IdentityResult<Vec<u8>> {
        self.keyring_for(space)?.decrypt(envelope)
    }

    /// Hash a private partition key for `space`
    pub fn hash_db_key(&self, key: &str, space: &str) -> IdentityResult<String> {
        Ok(self.keyring_for(Some(space))?.hash_db_key(key, space))
    }

    pub fn to_record(&self) -> IdentityResult<IdentityRecord> {
        let keyrings = self.read_keyrings()?;
        Ok(IdentityRecord {
            management_address: self.management_address.clone(),
            seed: self.main_keyring.seed().clone(),
            space_seeds: keyrings
                .iter()
                .map(|(name, keyring)| (name.clone(), keyring.seed().clone()))
                .collect(),
        })
    }

    /// Serialize the full state; [`IdentityCore::from_state`] reverses it
    pub fn serialize_state(&self) -> IdentityResult<String> {
        self.to_record()?.to_json()
    }

    /// Remove the persisted record; in-memory keyrings live until drop
    pub fn logout(&self) -> IdentityResult<()> {
        if let Some(address) = &self.management_address {
            self.services.storage.remove(&self.services.storage_key(address))?;
            info!(address = %address, "Logged out");
        }
        Ok(())
    }

    fn keyring_for(&self, space: Option<&str>) -> IdentityResult<Arc<Keyring>> {
        match space {
            None => Ok(self.main_keyring.clone()),
            Some(name) => self
                .space_keyring(name)?
                .ok_or_else(|| IdentityError::UnknownSpace(name.to_string())),
        }
    }

    fn has_keyring(&self, name: &str) -> IdentityResult<bool> {
        Ok(self.read_keyrings()?.contains_key(name))
    }

    fn persist(&self) -> IdentityResult<()> {
        self.persist_record(&self.to_record()?)
    }

    fn persist_record(&self, record: &IdentityRecord) -> IdentityResult<()> {
        let Some(address) = &self.management_address else {
            debug!("Identity has no management address; not persisting");
            return Ok(());
        };
        let serialized = record.to_json()?;
        self.services
            .storage
            .save(&self.services.storage_key(address), &serialized)?;
        Ok(())
    }

    fn read_keyrings(&self) -> IdentityResult<RwLockReadGuard<'_, HashMap<String, Arc<Keyring>>>> {
        self.keyrings.read().map_err(handle_poison)
    }

    fn write_keyrings(&self) -> IdentityResult<RwLockWriteGuard<'_, HashMap<String, Arc<Keyring>>>> {
        self.keyrings.write().map_err(handle_poison)
    }
}

impl fmt::Debug for IdentityCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCore")
            .field("management_address", &self.management_address)
            .field("did", &self.did.as_ref().map(Did::as_str))
            .field("spaces", &self.space_names().unwrap_or_default())
            .finish()
    }
}
