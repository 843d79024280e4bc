//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired entries out of the
//! built-in memory store.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::RefreshCache;
use crate::storage::MemoryStore;

/// Spawns a background task that periodically removes expired entries.
///
/// Reads already skip expired entries; the sweep only reclaims memory held
/// by keys nobody reads again.
///
/// # Arguments
/// * `cache` - handle to a cache backed by [`MemoryStore`]
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, used to abort it on shutdown.
///
/// # Example
/// ```ignore
/// let cache = RefreshCache::from_config(Config::default());
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 600);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    cache: RefreshCache<MemoryStore>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.store().cleanup_expired().await;
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = RefreshCache::from_config(Config::default());
        cache
            .set("expire_soon", json!("value"), Some(1), None)
            .await
            .unwrap();

        let handle = spawn_cleanup_task(cache.clone(), 1);

        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(cache.store().len().await, 0, "Expired entry should have been swept");
        assert_eq!(cache.store().stats().await.expirations, 1);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_preserves_valid_entries() {
        let cache = RefreshCache::from_config(Config::default());
        cache
            .set("long_lived", json!("value"), Some(3600), None)
            .await
            .unwrap();

        let handle = spawn_cleanup_task(cache.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.get("long_lived").await.unwrap(), json!("value"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let cache = RefreshCache::from_config(Config::default());

        let handle = spawn_cleanup_task(cache, 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
