//! Batch argument shapes
//!
//! Entry values accepted by `mset` and key sets accepted by `del`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One value of an `mset` batch.
///
/// In JSON, an object carrying a `cacheValue` field is read as the expiring
/// shape; anything else is a plain value.
///
/// # Example
/// ```ignore
/// let batch: BTreeMap<String, MsetEntry> = serde_json::from_value(json!({
///     "a": 1,
///     "b": { "cacheValue": 2, "expiration": 30 }
/// }))?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MsetEntry {
    /// A value with its own TTL in seconds, overriding the batch TTL
    Expiring {
        #[serde(rename = "cacheValue")]
        cache_value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expiration: Option<u64>,
    },
    /// A bare value stored with the batch TTL
    Plain(Value),
}

impl MsetEntry {
    pub fn with_expiration(value: impl Into<Value>, expiration: u64) -> Self {
        MsetEntry::Expiring {
            cache_value: value.into(),
            expiration: Some(expiration),
        }
    }

    /// Splits the entry into its value and per-key TTL override.
    ///
    /// A zero expiration counts as no override.
    pub fn into_parts(self) -> (Value, Option<u64>) {
        match self {
            MsetEntry::Expiring {
                cache_value,
                expiration,
            } => (cache_value, expiration.filter(|ttl| *ttl > 0)),
            MsetEntry::Plain(value) => (value, None),
        }
    }
}

impl From<Value> for MsetEntry {
    fn from(value: Value) -> Self {
        MsetEntry::Plain(value)
    }
}

/// One key or a sequence of keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keys {
    One(String),
    Many(Vec<String>),
}

impl Keys {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Keys::One(key) => vec![key],
            Keys::Many(keys) => keys,
        }
    }
}

impl From<&str> for Keys {
    fn from(key: &str) -> Self {
        Keys::One(key.to_string())
    }
}

impl From<String> for Keys {
    fn from(key: String) -> Self {
        Keys::One(key)
    }
}

impl From<Vec<String>> for Keys {
    fn from(keys: Vec<String>) -> Self {
        Keys::Many(keys)
    }
}

impl From<Vec<&str>> for Keys {
    fn from(keys: Vec<&str>) -> Self {
        Keys::Many(keys.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Keys {
    fn from(keys: &[&str]) -> Self {
        Keys::Many(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Keys {
    fn from(keys: [&str; N]) -> Self {
        Keys::Many(keys.iter().map(|k| k.to_string()).collect())
    }
}
