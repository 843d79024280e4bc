//! Background Refresh Task
//!
//! Periodic timer that re-fetches registered keys before they expire.

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::debug;

use crate::cache::WeakRefreshCache;
use crate::storage::StorageEngine;

/// Spawns the refresh timer for one cache.
///
/// The first tick fires one full `period` after spawning. The task holds only
/// a weak handle and exits on the first tick after the cache is dropped.
pub(crate) fn spawn_refresh_task<S: StorageEngine>(
    cache: WeakRefreshCache<S>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(cache) = cache.upgrade() else {
                debug!("Cache dropped, background refresh exiting");
                break;
            };

            let triggered = cache.refresh_due().await;
            if triggered > 0 {
                debug!("Background refresh: triggered {} refreshes", triggered);
            }
        }
    })
}
