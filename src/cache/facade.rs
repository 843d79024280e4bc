//! Cache Facade Module
//!
//! Public cache contract: validates arguments, delegates data to the storage
//! engine and keeps the refresh registry in step with every write.

use std::sync::{Arc, Weak};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::cache::{MAX_KEY_LENGTH, MAX_TTL_SECONDS};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{Keys, MsetEntry};
use crate::refresh::{RefreshFn, RefreshRecord, RefreshRegistry, RefreshScheduler};
use crate::storage::{MemoryStore, StorageEngine};
use crate::tasks::spawn_refresh_task;

struct Shared<S> {
    config: Config,
    store: S,
    registry: RefreshRegistry,
    scheduler: RefreshScheduler,
    /// Serializes writers so each engine write and its registry update land together
    write_gate: Mutex<()>,
}

// == Refresh Cache ==
/// In-memory TTL cache with opt-in background refresh.
///
/// Cloning yields another handle to the same cache. The background refresh
/// timer holds only a weak reference and stops once every handle is dropped.
///
/// # Example
/// ```ignore
/// let cache = RefreshCache::from_config(Config::default());
/// let refresh = RefreshFn::new(|key| async move { load_from_db(&key).await });
/// cache.set("user:1", json!({"name": "Ada"}), Some(300), Some(refresh)).await?;
/// ```
pub struct RefreshCache<S = MemoryStore> {
    inner: Arc<Shared<S>>,
}

impl<S> Clone for RefreshCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Non-owning handle held by the background refresh task.
pub(crate) struct WeakRefreshCache<S>(Weak<Shared<S>>);

impl<S> WeakRefreshCache<S> {
    pub(crate) fn upgrade(&self) -> Option<RefreshCache<S>> {
        self.0.upgrade().map(|inner| RefreshCache { inner })
    }
}

impl RefreshCache<MemoryStore> {
    /// Creates a cache backed by a fresh [`MemoryStore`].
    pub fn from_config(config: Config) -> Self {
        Self::new(config, MemoryStore::new())
    }
}

impl<S: StorageEngine> RefreshCache<S> {
    // == Constructor ==
    pub fn new(config: Config, store: S) -> Self {
        let scheduler = RefreshScheduler::from_config(&config);
        debug!(
            cache_type = %config.cache_type,
            default_expiration = config.default_expiration,
            read_only = config.read_only,
            "Cache created"
        );
        Self {
            inner: Arc::new(Shared {
                config,
                store,
                registry: RefreshRegistry::new(),
                scheduler,
                write_gate: Mutex::new(()),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The underlying storage engine.
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    // == Get ==
    /// Returns the live value for `key`.
    ///
    /// # Errors
    /// - `InvalidArgument` for an empty or oversized key
    /// - `NotFound` if the key is absent or expired
    /// - `Backend` if the engine fails
    pub async fn get(&self, key: &str) -> Result<Value> {
        validate_key(key)?;
        if self.verbose() {
            debug!(key, "get() called");
        }

        self.inner
            .store
            .get(key)
            .await?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    // == Multi Get ==
    /// Looks up several keys at once. Results follow the input order, with
    /// `None` marking a miss.
    pub async fn mget<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<Value>>> {
        let keys = validate_keys(keys.iter().map(|k| k.as_ref().to_string()).collect())?;
        if self.verbose() {
            debug!(?keys, "mget() called");
        }

        self.inner.store.mget(&keys).await
    }

    // == Set ==
    /// Stores `value` under `key`.
    ///
    /// `ttl` is in seconds; `None` or zero selects the configured default.
    /// With a `refresh_fn` the key is registered for background refresh and
    /// the refresh timer is armed on first use.
    ///
    /// In read-only mode this returns `Ok(())` without storing anything.
    ///
    /// # Errors
    /// - `InvalidArgument` for an empty or oversized key, or a TTL above
    ///   [`MAX_TTL_SECONDS`]
    /// - `Configuration` if a refresh is requested with an invalid refresh
    ///   interval or outside a tokio runtime; nothing is written
    /// - `Backend` if the engine write fails; no refresh record is kept
    pub async fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Option<u64>,
        refresh_fn: Option<RefreshFn>,
    ) -> Result<()> {
        validate_key(key)?;
        if self.verbose() {
            debug!(key, ?ttl, refresh = refresh_fn.is_some(), "set() called");
        }
        if self.inner.config.read_only {
            return Ok(());
        }

        let ttl = self.resolve_ttl(ttl);
        validate_ttl(ttl)?;

        let refreshing = refresh_fn.is_some();
        if refreshing {
            self.inner.scheduler.preflight()?;
        }

        {
            let _gate = self.inner.write_gate.lock().await;
            self.write_locked(key, value, ttl, refresh_fn).await?;
        }

        if refreshing {
            self.arm()?;
        }
        Ok(())
    }

    // == Multi Set ==
    /// Stores a batch of entries, best-effort.
    ///
    /// Each entry's own expiration wins over `ttl`, which wins over the
    /// configured default. A key that fails validation, whose TTL is above
    /// [`MAX_TTL_SECONDS`], or whose engine write fails is logged and skipped.
    /// Returns the number of entries stored; zero in read-only mode.
    pub async fn mset<I, K, E>(&self, entries: I, ttl: Option<u64>) -> usize
    where
        I: IntoIterator<Item = (K, E)>,
        K: AsRef<str>,
        E: Into<MsetEntry>,
    {
        if self.verbose() {
            debug!(?ttl, "mset() called");
        }
        if self.inner.config.read_only {
            return 0;
        }

        let batch_ttl = self.resolve_ttl(ttl);
        let mut stored = 0;
        let _gate = self.inner.write_gate.lock().await;
        for (key, entry) in entries {
            let key = key.as_ref();
            if let Err(err) = validate_key(key) {
                warn!(key, error = %err, "mset() skipped key");
                continue;
            }

            let (value, expiration) = entry.into().into_parts();
            let ttl = expiration.unwrap_or(batch_ttl);
            if let Err(err) = validate_ttl(ttl) {
                warn!(key, error = %err, "mset() skipped key");
                continue;
            }
            if self.write_locked(key, value, ttl, None).await.is_ok() {
                stored += 1;
            }
        }
        stored
    }

    // == Delete ==
    /// Deletes one or many keys and their refresh registrations.
    ///
    /// Returns the number of values the engine removed. Refresh records are
    /// dropped for every listed key, stored or not.
    pub async fn del(&self, keys: impl Into<Keys>) -> Result<usize> {
        let keys = validate_keys(keys.into().into_vec())?;
        if self.verbose() {
            debug!(?keys, "del() called");
        }

        let _gate = self.inner.write_gate.lock().await;
        let removed = self.inner.store.del(&keys).await.map_err(|err| {
            error!(cache_type = %self.inner.config.cache_type, error = %err, "del() failed");
            err
        })?;
        self.inner.registry.remove_many(&keys).await;
        Ok(removed)
    }

    // == Flush ==
    /// Removes every value and every refresh registration.
    pub async fn flush(&self) -> Result<()> {
        if self.verbose() {
            debug!("flush() called");
        }

        let _gate = self.inner.write_gate.lock().await;
        self.inner.store.flush_all().await.map_err(|err| {
            error!(cache_type = %self.inner.config.cache_type, error = %err, "flush() failed");
            err
        })?;
        self.inner.registry.clear().await;
        Ok(())
    }

    // == Scheduler Control ==
    /// Starts the background refresh timer if it is not running yet.
    ///
    /// Returns `Ok(true)` if this call started it.
    pub fn arm(&self) -> Result<bool> {
        let cache = self.downgrade();
        self.inner
            .scheduler
            .arm(move |period| spawn_refresh_task(cache, period))
    }

    pub fn is_armed(&self) -> bool {
        self.inner.scheduler.is_armed()
    }

    /// Stops the background refresh timer. Returns true if it was running.
    pub fn stop(&self) -> bool {
        self.inner.scheduler.stop()
    }

    // == Registry Introspection ==
    /// Keys currently registered for background refresh, sorted.
    pub async fn refresh_keys(&self) -> Vec<String> {
        self.inner.registry.keys().await
    }

    pub async fn refresh_record(&self, key: &str) -> Option<RefreshRecord> {
        self.inner.registry.get(key).await
    }

    // == Background Refresh ==
    /// Runs one scheduler tick: triggers a refresh for every registered key
    /// inside the pre-expiry window, each in its own task. A record whose
    /// previous refresh is still running is skipped.
    ///
    /// Returns the number of refreshes started.
    pub(crate) async fn refresh_due(&self) -> usize {
        let min_ttl = self.inner.scheduler.min_ttl();
        let due = self.inner.registry.claim_due(min_ttl).await;

        let count = due.len();
        for (key, record) in due {
            let cache = self.clone();
            tokio::spawn(async move { cache.refresh_key(key, record).await });
        }
        count
    }

    async fn refresh_key(&self, key: String, record: RefreshRecord) {
        let generation = record.generation;
        self.run_refresh(key, record).await;
        self.inner.registry.release(generation).await;
    }

    async fn run_refresh(&self, key: String, record: RefreshRecord) {
        let value = match record.refresh_fn.call(&key).await {
            Ok(value) => value,
            Err(source) => {
                if self.verbose() {
                    let err = CacheError::Refresh { key, source };
                    warn!(error = %err, "Background refresh failed");
                }
                return;
            }
        };

        match self.apply_refresh(&key, value, &record).await {
            Ok(true) => debug!(key = %key, lifespan = record.lifespan, "Key refreshed"),
            Ok(false) => debug!(key = %key, "Refreshed value discarded; key changed meanwhile"),
            Err(err) => {
                if self.verbose() {
                    warn!(key = %key, error = %err, "Background refresh could not store value");
                }
            }
        }
    }

    /// Re-stores a refreshed value, provided the registry still holds the
    /// record that was scanned. A key deleted, flushed or re-set while its
    /// callback ran keeps its newer state.
    async fn apply_refresh(&self, key: &str, value: Value, record: &RefreshRecord) -> Result<bool> {
        let _gate = self.inner.write_gate.lock().await;
        if self.inner.registry.generation_of(key).await != Some(record.generation) {
            return Ok(false);
        }

        self.write_locked(key, value, record.lifespan, Some(record.refresh_fn.clone()))
            .await?;
        Ok(true)
    }

    // == Internals ==
    /// Writes the value, then brings the refresh registry in line. Callers
    /// hold the write gate.
    async fn write_locked(
        &self,
        key: &str,
        value: Value,
        ttl: u64,
        refresh_fn: Option<RefreshFn>,
    ) -> Result<()> {
        if let Err(err) = self.inner.store.set(key, value, ttl).await {
            error!(
                cache_type = %self.inner.config.cache_type,
                key,
                error = %err,
                "set() failed"
            );
            return Err(err);
        }

        match refresh_fn {
            Some(refresh_fn) => {
                self.inner.registry.upsert(key, ttl, refresh_fn).await;
            }
            None => {
                self.inner.registry.remove(key).await;
            }
        }
        Ok(())
    }

    fn resolve_ttl(&self, ttl: Option<u64>) -> u64 {
        ttl.filter(|ttl| *ttl > 0)
            .unwrap_or(self.inner.config.default_expiration)
    }

    fn verbose(&self) -> bool {
        self.inner.config.verbose
    }

    pub(crate) fn downgrade(&self) -> WeakRefreshCache<S> {
        WeakRefreshCache(Arc::downgrade(&self.inner))
    }
}

// == Validation ==
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidArgument("key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidArgument(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

fn validate_ttl(ttl: u64) -> Result<()> {
    if ttl > MAX_TTL_SECONDS {
        return Err(CacheError::InvalidArgument(format!(
            "ttl of {}s exceeds maximum of {}s",
            ttl, MAX_TTL_SECONDS
        )));
    }
    Ok(())
}

fn validate_keys(keys: Vec<String>) -> Result<Vec<String>> {
    if keys.is_empty() {
        return Err(CacheError::InvalidArgument(
            "at least one key is required".to_string(),
        ));
    }
    for key in &keys {
        validate_key(key)?;
    }
    Ok(keys)
}
