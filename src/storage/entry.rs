//! Stored Entry Module
//!
//! Defines the structure for individual engine entries with TTL support.

use serde_json::Value;
use tokio::time::{Duration, Instant};

// == Stored Entry ==
/// A single value held by the storage engine, with its expiry.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The stored value
    pub value: Value,
    /// Instant the entry was written
    pub created_at: Instant,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates a new entry that expires `ttl_seconds` from now.
    ///
    /// A TTL of zero, or one too large to represent as an instant, means the
    /// entry never expires.
    pub fn new(value: Value, ttl_seconds: u64) -> Self {
        let now = Instant::now();
        let expires_at = if ttl_seconds > 0 {
            now.checked_add(Duration::from_secs(ttl_seconds))
        } else {
            None
        };

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current instant reaches its expiration
    /// instant, so a fully elapsed TTL is never served.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires| Instant::now() >= expires)
    }

    // == Time To Live ==
    /// Returns remaining TTL, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has a TTL that hasn't elapsed
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}
