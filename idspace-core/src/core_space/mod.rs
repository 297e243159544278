//! Space orchestration
//!
//! - **Space**: one named, encryption-scoped store per identity, opened
//!   behind a space consent and registered in the shared root index
//! - **Threads**: handles cached per resolved address, one per thread
//! - **Subscriptions**: idempotent `thread-<address>` records in the
//!   space's public partition

pub mod address;
pub mod errors;
pub mod root_index;
pub mod space;
pub mod subscription;
pub mod thread;

#[cfg(test)]
mod tests;

pub use address::{space_store_name, thread_store_name, StoreAddress};
pub use errors::{SpaceError, SpaceResult};
pub use root_index::{reconcile, Reconciliation, SpaceIndexEntry};
pub use space::{OpenOptions, Space, SpaceConsentCallback, SpaceServices, SyncDoneCallback, SyncState};
pub use subscription::{subscription_key, SubscribedThread};
pub use thread::{MemoryThreadBackend, ThreadBackend, ThreadConfig, ThreadHandle, ThreadOptions};
