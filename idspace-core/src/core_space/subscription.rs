//! Thread subscription records
//!
//! A subscription is a public entry under `thread-<address>`. Fields other
//! clients add are kept in `extra` and written back unchanged.

use super::address::StoreAddress;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub const THREAD_KEY_PREFIX: &str = "thread-";

/// Public key of the subscription record for `address`
pub fn subscription_key(address: &str) -> String {
    format!("{}{}", THREAD_KEY_PREFIX, address)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribedThread {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "firstModerator",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub first_moderator: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_bool"
    )]
    pub members: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SubscribedThread {
    pub fn new(address: &str) -> Self {
        SubscribedThread {
            address: address.to_string(),
            name: None,
            first_moderator: None,
            members: None,
            extra: Map::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_first_moderator(mut self, did: &str) -> Self {
        self.first_moderator = Some(did.to_string());
        self
    }

    pub fn with_members(mut self, members: bool) -> Self {
        self.members = Some(members);
        self
    }
}

/// Older clients stored `members` as `"true"`/`"false"`
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

/// Decode one public entry as a subscription
///
/// Returns `None` for keys outside the subscription namespace and for
/// malformed legacy entries.
pub fn parse_subscription(key: &str, value: &Value) -> Option<SubscribedThread> {
    let address = key.strip_prefix(THREAD_KEY_PREFIX)?;
    if !StoreAddress::is_valid(address) {
        debug!(key, "Dropping subscription with invalid address");
        return None;
    }

    let mut record = value.as_object()?.clone();
    record
        .entry("address")
        .or_insert_with(|| Value::String(address.to_string()));
    match serde_json::from_value(Value::Object(record)) {
        Ok(thread) => Some(thread),
        Err(e) => {
            debug!(key, error = %e, "Dropping malformed subscription");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ADDRESS: &str = "/orbitdb/QmThread/3box.thread.music.general";

    #[test]
    fn test_serializes_with_extra_fields() {
        let mut thread = SubscribedThread::new(ADDRESS)
            .with_name("general")
            .with_first_moderator("did:muport:Qm1");
        thread.extra.insert("pinned".to_string(), json!(true));

        let value = serde_json::to_value(&thread).unwrap();
        assert_eq!(
            value,
            json!({
                "address": ADDRESS,
                "name": "general",
                "firstModerator": "did:muport:Qm1",
                "pinned": true
            })
        );
    }

    #[test]
    fn test_parse_accepts_legacy_members_string() {
        let value = json!({"address": ADDRESS, "members": "true", "name": "general"});
        let thread = parse_subscription(&subscription_key(ADDRESS), &value).unwrap();
        assert_eq!(thread.members, Some(true));
        assert_eq!(thread.name.as_deref(), Some("general"));
    }

    #[test]
    fn test_parse_fills_missing_address() {
        let thread = parse_subscription(&subscription_key(ADDRESS), &json!({})).unwrap();
        assert_eq!(thread.address, ADDRESS);
    }

    #[test]
    fn test_parse_drops_malformed() {
        assert!(parse_subscription("profile", &json!({})).is_none());
        assert!(parse_subscription("thread-v1-experimental", &json!({})).is_none());
        assert!(parse_subscription(&subscription_key(ADDRESS), &json!("string")).is_none());
        assert!(parse_subscription(&subscription_key(ADDRESS), &json!({"name": 5})).is_none());
    }
}
