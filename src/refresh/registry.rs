//! Refresh Registry Module
//!
//! Bookkeeping for keys that were stored with a refresh callback.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

/// Expiry used when `now + lifespan` cannot be represented.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Future returned by a refresh callback.
pub type RefreshFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>;

// == Refresh Fn ==
/// Caller-supplied callback that produces a fresh value for a key.
///
/// Cloning is cheap; all clones share the same closure.
#[derive(Clone)]
pub struct RefreshFn(Arc<dyn Fn(String) -> RefreshFuture + Send + Sync>);

impl RefreshFn {
    /// Wraps an async closure as a refresh callback.
    ///
    /// # Example
    /// ```ignore
    /// let refresh = RefreshFn::new(|key| async move {
    ///     anyhow::Ok(serde_json::json!(format!("fresh value for {key}")))
    /// });
    /// ```
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self(Arc::new(move |key| -> RefreshFuture { Box::pin(f(key)) }))
    }

    /// Invokes the callback for `key`.
    pub fn call(&self, key: &str) -> RefreshFuture {
        (self.0)(key.to_string())
    }
}

impl fmt::Debug for RefreshFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshFn(..)")
    }
}

// == Refresh Record ==
/// Refresh metadata for one key.
#[derive(Debug, Clone)]
pub struct RefreshRecord {
    /// Instant the stored value expires
    pub expires_at: Instant,
    /// TTL in seconds re-applied on every refresh
    pub lifespan: u64,
    /// Callback producing the next value
    pub refresh_fn: RefreshFn,
    /// Stamp identifying this particular upsert
    pub generation: u64,
}

impl RefreshRecord {
    /// Time left before the stored value expires, saturating at zero.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Whether the record falls inside the pre-expiry refresh window.
    pub fn is_due(&self, min_ttl: Duration) -> bool {
        self.remaining() < min_ttl
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    records: HashMap<String, RefreshRecord>,
    next_generation: u64,
    /// Generations whose callback is still running
    in_flight: HashSet<u64>,
}

// == Refresh Registry ==
/// Key to [`RefreshRecord`] map behind a single coarse lock.
///
/// Every mutation and every scan holds the lock for its whole duration, so a
/// scan never observes a half-written record or the same key twice.
#[derive(Debug, Default)]
pub struct RefreshRegistry {
    state: RwLock<RegistryState>,
}

impl RefreshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // == Upsert ==
    /// Inserts or replaces the record for `key`, expiring `lifespan` seconds
    /// from now. Returns the generation assigned to the new record.
    pub async fn upsert(&self, key: &str, lifespan: u64, refresh_fn: RefreshFn) -> u64 {
        let mut state = self.state.write().await;
        state.next_generation += 1;
        let generation = state.next_generation;

        let now = Instant::now();
        let record = RefreshRecord {
            expires_at: now
                .checked_add(Duration::from_secs(lifespan))
                .unwrap_or(now + FAR_FUTURE),
            lifespan,
            refresh_fn,
            generation,
        };
        state.records.insert(key.to_string(), record);
        generation
    }

    // == Remove ==
    /// Drops the record for `key`. Returns true if one existed.
    pub async fn remove(&self, key: &str) -> bool {
        self.state.write().await.records.remove(key).is_some()
    }

    /// Drops the records for all `keys`, returning how many existed.
    pub async fn remove_many(&self, keys: &[String]) -> usize {
        let mut state = self.state.write().await;
        keys.iter()
            .filter(|key| state.records.remove(key.as_str()).is_some())
            .count()
    }

    /// Drops every record.
    pub async fn clear(&self) {
        self.state.write().await.records.clear();
    }

    // == Scan ==
    /// Returns a snapshot of every record.
    pub async fn scan(&self) -> Vec<(String, RefreshRecord)> {
        let state = self.state.read().await;
        state
            .records
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }

    // == Claim ==
    /// Returns the records inside the refresh window whose previous refresh
    /// has finished, marking each as in flight until [`release`] is called
    /// with its generation.
    ///
    /// [`release`]: RefreshRegistry::release
    pub async fn claim_due(&self, min_ttl: Duration) -> Vec<(String, RefreshRecord)> {
        let mut state = self.state.write().await;
        let RegistryState {
            records, in_flight, ..
        } = &mut *state;

        records
            .iter()
            .filter(|(_, record)| record.is_due(min_ttl) && in_flight.insert(record.generation))
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect()
    }

    /// Marks the refresh of `generation` as finished.
    pub async fn release(&self, generation: u64) {
        self.state.write().await.in_flight.remove(&generation);
    }

    /// Generation of the current record for `key`, if any.
    pub async fn generation_of(&self, key: &str) -> Option<u64> {
        let state = self.state.read().await;
        state.records.get(key).map(|record| record.generation)
    }

    /// Returns a copy of the current record for `key`.
    pub async fn get(&self, key: &str) -> Option<RefreshRecord> {
        self.state.read().await.records.get(key).cloned()
    }

    /// Registered keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut keys: Vec<String> = state.records.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::advance;

    fn constant(value: Value) -> RefreshFn {
        RefreshFn::new(move |_key| {
            let value = value.clone();
            async move { anyhow::Ok(value) }
        })
    }

    #[tokio::test]
    async fn test_refresh_fn_receives_key() {
        let refresh = RefreshFn::new(|key| async move { anyhow::Ok(json!(format!("fresh:{key}"))) });
        assert_eq!(refresh.call("user:7").await.unwrap(), json!("fresh:user:7"));
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let registry = RefreshRegistry::new();
        registry.upsert("a", 60, constant(json!(1))).await;

        let record = registry.get("a").await.unwrap();
        assert_eq!(record.lifespan, 60);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_bumps_generation() {
        let registry = RefreshRegistry::new();
        let first = registry.upsert("a", 60, constant(json!(1))).await;
        let second = registry.upsert("a", 30, constant(json!(2))).await;

        assert!(second > first);
        assert_eq!(registry.generation_of("a").await, Some(second));
        assert_eq!(registry.get("a").await.unwrap().lifespan, 30);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_and_remove_many() {
        let registry = RefreshRegistry::new();
        registry.upsert("a", 60, constant(json!(1))).await;
        registry.upsert("b", 60, constant(json!(2))).await;
        registry.upsert("c", 60, constant(json!(3))).await;

        assert!(registry.remove("a").await);
        assert!(!registry.remove("a").await);

        let keys = vec!["b".to_string(), "missing".to_string()];
        assert_eq!(registry.remove_many(&keys).await, 1);
        assert_eq!(registry.keys().await, vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let registry = RefreshRegistry::new();
        registry.upsert("a", 60, constant(json!(1))).await;

        registry.clear().await;
        assert!(registry.is_empty().await);
        registry.clear().await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_scan_returns_each_key_once() {
        let registry = RefreshRegistry::new();
        for key in ["a", "b", "c"] {
            registry.upsert(key, 60, constant(json!(key))).await;
        }
        registry.upsert("b", 90, constant(json!("b2"))).await;

        let mut keys: Vec<String> = registry.scan().await.into_iter().map(|(k, _)| k).collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_huge_lifespan_saturates() {
        let registry = RefreshRegistry::new();
        registry.upsert("a", u64::MAX, constant(json!(1))).await;

        let record = registry.get("a").await.unwrap();
        assert_eq!(record.lifespan, u64::MAX);
        assert!(!record.is_due(Duration::from_secs(70)));
    }

    #[tokio::test]
    async fn test_claim_skips_in_flight_until_released() {
        let registry = RefreshRegistry::new();
        let generation = registry.upsert("a", 1, constant(json!(1))).await;
        registry.upsert("b", 600, constant(json!(2))).await;
        let min_ttl = Duration::from_secs(3);

        let claimed = registry.claim_due(min_ttl).await;
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].0, "a");
        assert!(registry.claim_due(min_ttl).await.is_empty());

        registry.release(generation).await;
        assert_eq!(registry.claim_due(min_ttl).await.len(), 1);
    }

    #[tokio::test]
    async fn test_reupsert_is_claimable_while_old_generation_runs() {
        let registry = RefreshRegistry::new();
        registry.upsert("a", 1, constant(json!(1))).await;
        let min_ttl = Duration::from_secs(3);

        assert_eq!(registry.claim_due(min_ttl).await.len(), 1);
        registry.upsert("a", 1, constant(json!(2))).await;
        assert_eq!(registry.claim_due(min_ttl).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_is_due_inside_window() {
        let registry = RefreshRegistry::new();
        registry.upsert("a", 100, constant(json!(1))).await;
        let min_ttl = Duration::from_secs(70);

        assert!(!registry.get("a").await.unwrap().is_due(min_ttl));

        advance(Duration::from_secs(31)).await;
        let record = registry.get("a").await.unwrap();
        assert_eq!(record.remaining(), Duration::from_secs(69));
        assert!(record.is_due(min_ttl));
    }
}
