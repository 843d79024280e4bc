//! Storage Module
//!
//! The storage engine contract consumed by the cache facade, plus a minimal
//! in-memory engine.

mod entry;
mod memory;
mod stats;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

// Re-export public types
pub use entry::StoredEntry;
pub use memory::MemoryStore;
pub use stats::CacheStats;

// == Storage Engine ==
/// Source of truth for cached values and their expiry.
///
/// Implementations provide their own internal synchronization; the facade
/// calls them concurrently from request paths and the refresh scheduler.
#[async_trait]
pub trait StorageEngine: Send + Sync + 'static {
    /// Looks up a live value. `Ok(None)` for absent or expired keys.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Looks up several keys, answering in input order.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>>;

    /// Stores `value` under `key` for `ttl_seconds`. Zero means no expiry.
    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<()>;

    /// Removes the given keys, returning how many were present.
    async fn del(&self, keys: &[String]) -> Result<usize>;

    /// Removes every entry.
    async fn flush_all(&self) -> Result<()>;
}
