//! Memory Store Module
//!
//! Minimal in-memory storage engine: a HashMap with lazy and swept TTL expiry.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::storage::{CacheStats, StorageEngine, StoredEntry};

// == Store State ==
/// Entries and counters guarded together by the store lock.
#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, StoredEntry>,
    stats: CacheStats,
}

impl StoreState {
    /// Returns the live value for `key`, dropping it if it has expired.
    fn lookup(&mut self, key: &str) -> Option<Value> {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(key);
                self.stats.record_expirations(1);
                self.stats.record_miss();
                None
            }
            Some(entry) => {
                let value = entry.value.clone();
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }
}

// == Memory Store ==
/// In-memory storage engine.
///
/// Expired entries are never served: reads drop them on sight and
/// [`MemoryStore::cleanup_expired`] sweeps the rest.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired());

        let removed = before - state.entries.len();
        state.stats.record_expirations(removed);
        removed
    }

    // == Stats ==
    /// Returns current engine statistics.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    /// Returns the remaining TTL of a live entry, or None if absent, expired
    /// or non-expiring.
    pub async fn ttl(&self, key: &str) -> Option<std::time::Duration> {
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(StoredEntry::ttl_remaining)
    }

    /// Number of entries currently held, including not-yet-swept expired ones.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

#[async_trait]
impl StorageEngine for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.state.write().await.lookup(key))
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>> {
        let mut state = self.state.write().await;
        Ok(keys.iter().map(|key| state.lookup(key)).collect())
    }

    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .entries
            .insert(key.to_string(), StoredEntry::new(value, ttl_seconds));
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<usize> {
        let mut state = self.state.write().await;
        let removed = keys
            .iter()
            .filter(|key| state.entries.remove(key.as_str()).is_some())
            .count();
        Ok(removed)
    }

    async fn flush_all(&self) -> Result<()> {
        self.state.write().await.entries.clear();
        Ok(())
    }
}
