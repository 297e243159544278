//! Persisted identity record
//!
//! ```json
//! { "managementAddress": "0xabc…", "seed": "0x…", "spaceSeeds": { "music": "0x…" } }
//! ```

use super::errors::{IdentityError, IdentityResult};
use super::seed::KeyringSeed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    #[serde(rename = "managementAddress", default, skip_serializing_if = "Option::is_none")]
    pub management_address: Option<String>,
    pub seed: KeyringSeed,
    #[serde(rename = "spaceSeeds", default)]
    pub space_seeds: BTreeMap<String, KeyringSeed>,
}

impl IdentityRecord {
    pub fn new(management_address: Option<String>, seed: KeyringSeed) -> Self {
        IdentityRecord {
            management_address: management_address.map(|a| normalize_address(&a)),
            seed,
            space_seeds: BTreeMap::new(),
        }
    }

    /// Parse a serialized record, normalizing the management address
    pub fn parse(serialized: &str) -> IdentityResult<Self> {
        let mut record: IdentityRecord = serde_json::from_str(serialized)
            .map_err(|e| IdentityError::MalformedState(e.to_string()))?;
        record.management_address = record
            .management_address
            .as_deref()
            .map(normalize_address);
        Ok(record)
    }

    pub fn to_json(&self) -> IdentityResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Single case-folded form used for storing and comparing addresses
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}
