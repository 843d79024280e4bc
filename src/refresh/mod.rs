//! Refresh Module
//!
//! Proactive refresh of keys nearing expiry: the registry of refreshable keys
//! and the timer that scans it.

mod registry;
mod scheduler;

pub use registry::{RefreshFn, RefreshFuture, RefreshRecord, RefreshRegistry};
pub use scheduler::RefreshScheduler;
