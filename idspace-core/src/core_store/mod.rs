/*
    core_store - Public and private views over one key-value store

    A space keeps both of its partitions in a single store owned by an
    external log database:
    - `PublicStore`: plain keys, plain values
    - `PrivateStore`: hashed keys, encrypted `{key, value}` envelopes
    Partitions are separated by the tagged `StoreKey`, never by ad-hoc
    string handling in the views.
*/

pub mod errors;
pub mod key;
pub mod memory;
pub mod private;
pub mod public;
pub mod traits;
pub mod types;

#[cfg(test)]
mod tests;

pub use errors::{StoreError, StoreResult};
pub use key::{Partition, StoreKey};
pub use memory::{MemoryKeyValueStore, MemoryLogDatabase, MemoryRootIndex};
pub use private::PrivateStore;
pub use public::PublicStore;
pub use traits::{KeyValueStore, LogDatabase, RootIndex};
pub use types::{EntryMetadata, IndexEntry, IndexPayload, LogEntry, LogOperation, StoreEntry, Timestamp};
