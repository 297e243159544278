//! Root index reconciliation
//!
//! The root index is shared by every space of an identity. Each space owns
//! at most one current entry, found by matching its store name against the
//! last path segment of the entry's `odbAddress`. Entries are appended or
//! deleted, never edited, and only entries matching this space are touched.

use super::errors::SpaceResult;
use crate::core_store::{IndexEntry, RootIndex};
use crate::metrics::{record_counter, ROOT_INDEX_ADDED, ROOT_INDEX_SUPERSEDED};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

const SPACE_ENTRY_TYPE: &str = "space";

/// Canonical root index value for a space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceIndexEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "DID")]
    pub did: String,
    #[serde(rename = "odbAddress")]
    pub odb_address: String,
}

impl SpaceIndexEntry {
    pub fn new(did: &str, odb_address: &str) -> Self {
        SpaceIndexEntry {
            kind: SPACE_ENTRY_TYPE.to_string(),
            did: did.to_string(),
            odb_address: odb_address.to_string(),
        }
    }
}

/// What reconciliation did to the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// A typed entry already existed
    Present,
    /// No entry existed and one was appended
    Added,
    /// A legacy untyped entry was deleted and replaced
    Superseded,
}

fn matches_store(entry: &IndexEntry, store_name: &str) -> bool {
    entry
        .payload
        .value
        .get("odbAddress")
        .and_then(Value::as_str)
        .and_then(|address| address.rsplit('/').next())
        .is_some_and(|last| last == store_name)
}

fn is_legacy(entry: &IndexEntry) -> bool {
    entry.payload.value.get("type").map_or(true, Value::is_null)
}

/// Make sure the index holds exactly one typed entry for `store_name`
pub async fn reconcile(
    index: &dyn RootIndex,
    store_name: &str,
    did: &str,
    odb_address: &str,
    limit: Option<usize>,
) -> SpaceResult<Reconciliation> {
    let entries = index.entries(limit).await?;
    let existing = entries.iter().find(|entry| matches_store(entry, store_name));
    let canonical = serde_json::to_value(SpaceIndexEntry::new(did, odb_address))
        .map_err(crate::core_store::StoreError::from)?;

    match existing {
        Some(entry) if !is_legacy(entry) => {
            debug!(store = store_name, "Root index entry present");
            Ok(Reconciliation::Present)
        }
        Some(entry) => {
            index.del(&entry.hash).await?;
            index.add(canonical).await?;
            record_counter(ROOT_INDEX_SUPERSEDED, 1);
            info!(store = store_name, replaced = %entry.hash, "Superseded legacy root index entry");
            Ok(Reconciliation::Superseded)
        }
        None => {
            index.add(canonical).await?;
            record_counter(ROOT_INDEX_ADDED, 1);
            info!(store = store_name, "Registered space in root index");
            Ok(Reconciliation::Added)
        }
    }
}
