//! Self-sovereign identity with per-space keyrings and dual-partition
//! (public / private) key-value spaces over an external log database.

pub mod config;
pub mod core_identity;
pub mod core_space;
pub mod core_store;
pub mod logging;
pub mod metrics;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use core_identity::{IdentityCore, IdentityError, IdentityServices};
pub use core_space::{OpenOptions, Space, SpaceError, SpaceServices};
pub use core_store::{PrivateStore, PublicStore, StoreError};
pub use logging::{init_logging, LogLevel};
