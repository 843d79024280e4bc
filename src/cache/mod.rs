//! Cache Module
//!
//! The public cache facade: TTL storage with opt-in background refresh.

mod facade;


// Re-export public types
pub use facade::RefreshCache;
pub(crate) use facade::WeakRefreshCache;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Longest accepted TTL in seconds (ten years)
pub const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;
