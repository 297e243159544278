//! Store naming and address validation

use super::errors::{SpaceError, SpaceResult};
use std::fmt;

const ADDRESS_SCHEME: &str = "orbitdb";

/// Name of the key-value store backing space `space`
pub fn space_store_name(space: &str) -> String {
    format!("3box.space.{}.keyvalue", space)
}

/// Name of the store backing thread `thread` of space `space`
pub fn thread_store_name(space: &str, thread: &str) -> String {
    format!("3box.thread.{}.{}", space, thread)
}

/// A parsed `/orbitdb/<root>/<path>` store address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreAddress {
    root: String,
    path: String,
}

impl StoreAddress {
    /// Parse an address whose root is a base58 content hash and whose path
    /// is non-empty
    pub fn parse(address: &str) -> SpaceResult<Self> {
        let invalid = || SpaceError::InvalidAddress(address.to_string());

        let rest = address
            .strip_prefix('/')
            .and_then(|s| s.strip_prefix(ADDRESS_SCHEME))
            .and_then(|s| s.strip_prefix('/'))
            .ok_or_else(invalid)?;
        let (root, path) = rest.split_once('/').ok_or_else(invalid)?;

        if root.is_empty() || path.is_empty() {
            return Err(invalid());
        }
        match bs58::decode(root).into_vec() {
            Ok(bytes) if !bytes.is_empty() => {}
            _ => return Err(invalid()),
        }

        Ok(StoreAddress {
            root: root.to_string(),
            path: path.to_string(),
        })
    }

    pub fn is_valid(address: &str) -> bool {
        Self::parse(address).is_ok()
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Store name part of the address
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `(space, thread)` encoded in a thread store name
    pub fn thread_segments(&self) -> Option<(&str, &str)> {
        let mut segments = self.path.split('.').skip(2);
        Some((segments.next()?, segments.next()?))
    }
}

impl fmt::Display for StoreAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}/{}", ADDRESS_SCHEME, self.root, self.path)
    }
}
