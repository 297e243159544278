/*
    types.rs - Values exchanged with the underlying key-value store
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
pub type Timestamp = u64;

pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// A stored value together with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub value: Value,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub timestamp: Timestamp,
}

impl From<&StoreEntry> for EntryMetadata {
    fn from(entry: &StoreEntry) -> Self {
        EntryMetadata {
            timestamp: entry.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogOperation {
    Put,
    Del,
}

/// One operation of the store's append-only log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub op: LogOperation,
    pub key: String,
    /// Absent for deletions
    pub value: Option<Value>,
    pub timestamp: Timestamp,
}

/// Entry of the shared root index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub hash: String,
    pub payload: IndexPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPayload {
    pub value: Value,
}
