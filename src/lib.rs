//! Refresh Cache - An in-memory TTL cache with background refresh
//!
//! Values expire after their TTL unless stored with a refresh callback, in
//! which case they are re-fetched shortly before expiry.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod refresh;
pub mod storage;
pub mod tasks;

pub use cache::RefreshCache;
pub use config::Config;
pub use error::{CacheError, Result};
pub use models::{Keys, MsetEntry};
pub use refresh::RefreshFn;
pub use storage::{MemoryStore, StorageEngine};
pub use tasks::spawn_cleanup_task;
