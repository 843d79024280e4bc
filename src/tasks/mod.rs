//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - Background refresh: re-fetches registered keys nearing expiry
//! - TTL Cleanup: sweeps expired entries out of the memory store

mod cleanup;
mod refresh;

pub use cleanup::spawn_cleanup_task;
pub(crate) use refresh::spawn_refresh_task;
