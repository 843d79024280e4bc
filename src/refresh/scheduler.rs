//! Refresh Scheduler Module
//!
//! Owns the background refresh timer of one cache: its settings, the armed
//! flag, and the handle of the running task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::error::{CacheError, Result};

// == Refresh Scheduler ==
/// Lazily started, single-instance background refresh timer.
#[derive(Debug)]
pub struct RefreshScheduler {
    /// Scan period
    interval: Duration,
    /// Pre-expiry window inside which keys are refreshed
    min_ttl: Duration,
    /// Whether `interval <= min_ttl` is enforced at arm time
    interval_check: bool,
    armed: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(interval: Duration, min_ttl: Duration, interval_check: bool) -> Self {
        Self {
            interval,
            min_ttl,
            interval_check,
            armed: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.refresh_interval(),
            config.refresh_min_ttl(),
            config.background_refresh_interval_check,
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn min_ttl(&self) -> Duration {
        self.min_ttl
    }

    // == Validate ==
    /// Rejects a scan period longer than the refresh window.
    ///
    /// With such settings a key could pass through the whole window between
    /// two ticks and expire without ever being refreshed.
    pub fn validate(&self) -> Result<()> {
        if self.interval_check && self.interval > self.min_ttl {
            return Err(CacheError::Configuration(format!(
                "background refresh interval ({}ms) cannot be greater than background refresh min TTL ({}ms)",
                self.interval.as_millis(),
                self.min_ttl.as_millis()
            )));
        }
        Ok(())
    }

    // == Preflight ==
    /// Checks everything [`arm`] needs before it can start a timer: valid
    /// settings and a running tokio runtime.
    ///
    /// [`arm`]: RefreshScheduler::arm
    pub fn preflight(&self) -> Result<()> {
        self.validate()?;
        Handle::try_current().map_err(|_| {
            CacheError::Configuration(
                "background refresh requires a running tokio runtime".to_string(),
            )
        })?;
        Ok(())
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    // == Arm ==
    /// Starts the timer task produced by `spawn`, unless one is already running.
    ///
    /// Returns `Ok(true)` when this call started the timer and `Ok(false)` when
    /// it was already armed. Fails without spawning anything if the settings
    /// are invalid or no tokio runtime is available.
    pub fn arm<F>(&self, spawn: F) -> Result<bool>
    where
        F: FnOnce(Duration) -> JoinHandle<()>,
    {
        if self.is_armed() {
            return Ok(false);
        }

        let mut task = self.lock_task();
        if self.is_armed() {
            return Ok(false);
        }

        self.preflight()?;

        *task = Some(spawn(self.interval));
        self.armed.store(true, Ordering::Release);
        info!(
            interval_ms = self.interval.as_millis() as u64,
            min_ttl_ms = self.min_ttl.as_millis() as u64,
            "Background refresh armed"
        );
        Ok(true)
    }

    // == Stop ==
    /// Aborts the timer task and clears the armed flag.
    ///
    /// Returns true if a running timer was stopped. A later refresh-bearing
    /// `set` arms a fresh timer.
    pub fn stop(&self) -> bool {
        let mut task = self.lock_task();
        self.armed.store(false, Ordering::Release);
        match task.take() {
            Some(handle) => {
                handle.abort();
                info!("Background refresh stopped");
                true
            }
            None => false,
        }
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        let task = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_task(_period: Duration) -> JoinHandle<()> {
        tokio::spawn(std::future::pending::<()>())
    }

    #[test]
    fn test_default_settings_are_valid() {
        let scheduler = RefreshScheduler::from_config(&Config::default());
        assert!(scheduler.validate().is_ok());
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn test_interval_longer_than_min_ttl_is_rejected() {
        let scheduler =
            RefreshScheduler::new(Duration::from_millis(80_000), Duration::from_millis(70_000), true);
        assert!(matches!(scheduler.validate(), Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_interval_equal_to_min_ttl_is_accepted() {
        let scheduler =
            RefreshScheduler::new(Duration::from_millis(70_000), Duration::from_millis(70_000), true);
        assert!(scheduler.validate().is_ok());
    }

    #[test]
    fn test_interval_check_can_be_disabled() {
        let scheduler =
            RefreshScheduler::new(Duration::from_millis(80_000), Duration::from_millis(70_000), false);
        assert!(scheduler.validate().is_ok());
    }

    #[tokio::test]
    async fn test_arm_is_idempotent() {
        let scheduler = RefreshScheduler::from_config(&Config::default());
        let mut spawned = 0;

        assert!(scheduler.arm(|p| { spawned += 1; idle_task(p) }).unwrap());
        assert!(!scheduler.arm(|p| { spawned += 1; idle_task(p) }).unwrap());

        assert_eq!(spawned, 1);
        assert!(scheduler.is_armed());
    }

    #[tokio::test]
    async fn test_failed_arm_spawns_nothing() {
        let scheduler =
            RefreshScheduler::new(Duration::from_millis(80_000), Duration::from_millis(70_000), true);
        let mut spawned = false;

        let result = scheduler.arm(|p| { spawned = true; idle_task(p) });

        assert!(matches!(result, Err(CacheError::Configuration(_))));
        assert!(!spawned);
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn test_preflight_requires_runtime() {
        let scheduler = RefreshScheduler::from_config(&Config::default());
        assert!(matches!(scheduler.preflight(), Err(CacheError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_preflight_passes_inside_runtime() {
        let scheduler = RefreshScheduler::from_config(&Config::default());
        assert!(scheduler.preflight().is_ok());
    }

    #[test]
    fn test_arm_outside_runtime_fails() {
        let scheduler = RefreshScheduler::from_config(&Config::default());
        let result = scheduler.arm(idle_task);
        assert!(matches!(result, Err(CacheError::Configuration(_))));
        assert!(!scheduler.is_armed());
    }

    #[tokio::test]
    async fn test_stop_aborts_and_allows_rearm() {
        let scheduler = RefreshScheduler::from_config(&Config::default());
        scheduler.arm(idle_task).unwrap();

        assert!(scheduler.stop());
        assert!(!scheduler.is_armed());
        assert!(!scheduler.stop());

        assert!(scheduler.arm(idle_task).unwrap());
    }
}
