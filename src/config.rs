//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Emit a diagnostic event for every cache operation
    pub verbose: bool,
    /// Default TTL in seconds for entries set without an explicit TTL
    pub default_expiration: u64,
    /// Accept `set`/`mset` calls without storing anything
    pub read_only: bool,
    /// Reserved; parsed and carried but not consulted by any code path
    pub check_on_previous_empty: bool,
    /// Reject a refresh interval longer than the minimum pre-expiry window
    pub background_refresh_interval_check: bool,
    /// Background refresh scan period in milliseconds
    pub background_refresh_interval: u64,
    /// Keys whose remaining TTL drops below this many milliseconds get refreshed
    pub background_refresh_min_ttl: u64,
    /// Name of the storage engine, used in log messages
    pub cache_type: String,
    /// Expired-entry sweep period of the built-in engine, in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_VERBOSE` (default: false)
    /// - `CACHE_DEFAULT_EXPIRATION` - seconds (default: 900)
    /// - `CACHE_READ_ONLY` (default: false)
    /// - `CACHE_CHECK_ON_PREVIOUS_EMPTY` (default: true)
    /// - `CACHE_BACKGROUND_REFRESH_INTERVAL_CHECK` (default: true)
    /// - `CACHE_BACKGROUND_REFRESH_INTERVAL` - milliseconds (default: 60000)
    /// - `CACHE_BACKGROUND_REFRESH_MIN_TTL` - milliseconds (default: 70000)
    /// - `CACHE_TYPE` (default: "memory")
    /// - `CACHE_CLEANUP_INTERVAL` - seconds (default: 600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            verbose: env_or("CACHE_VERBOSE", defaults.verbose),
            default_expiration: env_or("CACHE_DEFAULT_EXPIRATION", defaults.default_expiration),
            read_only: env_or("CACHE_READ_ONLY", defaults.read_only),
            check_on_previous_empty: env_or(
                "CACHE_CHECK_ON_PREVIOUS_EMPTY",
                defaults.check_on_previous_empty,
            ),
            background_refresh_interval_check: env_or(
                "CACHE_BACKGROUND_REFRESH_INTERVAL_CHECK",
                defaults.background_refresh_interval_check,
            ),
            background_refresh_interval: env_or(
                "CACHE_BACKGROUND_REFRESH_INTERVAL",
                defaults.background_refresh_interval,
            ),
            background_refresh_min_ttl: env_or(
                "CACHE_BACKGROUND_REFRESH_MIN_TTL",
                defaults.background_refresh_min_ttl,
            ),
            cache_type: env::var("CACHE_TYPE").unwrap_or(defaults.cache_type),
            cleanup_interval: env_or("CACHE_CLEANUP_INTERVAL", defaults.cleanup_interval),
        }
    }

    /// Background refresh scan period.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.background_refresh_interval)
    }

    /// Pre-expiry window inside which a key is refreshed.
    pub fn refresh_min_ttl(&self) -> Duration {
        Duration::from_millis(self.background_refresh_min_ttl)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: false,
            default_expiration: 900,
            read_only: false,
            check_on_previous_empty: true,
            background_refresh_interval_check: true,
            background_refresh_interval: 60_000,
            background_refresh_min_ttl: 70_000,
            cache_type: "memory".to_string(),
            cleanup_interval: 600,
        }
    }
}

/// Reads and parses an environment variable, falling back on absence or parse failure.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(!config.verbose);
        assert_eq!(config.default_expiration, 900);
        assert!(!config.read_only);
        assert!(config.check_on_previous_empty);
        assert!(config.background_refresh_interval_check);
        assert_eq!(config.background_refresh_interval, 60_000);
        assert_eq!(config.background_refresh_min_ttl, 70_000);
        assert_eq!(config.cache_type, "memory");
    }

    #[test]
    fn test_duration_helpers() {
        let config = Config::default();
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.refresh_min_ttl(), Duration::from_secs(70));
    }

    #[test]
    fn test_config_from_env_overrides() {
        env::set_var("CACHE_READ_ONLY", "true");
        env::set_var("CACHE_BACKGROUND_REFRESH_INTERVAL", "5000");
        env::set_var("CACHE_DEFAULT_EXPIRATION", "not-a-number");

        let config = Config::from_env();
        assert!(config.read_only);
        assert_eq!(config.background_refresh_interval, 5000);
        // Unparseable values fall back to the default
        assert_eq!(config.default_expiration, 900);

        env::remove_var("CACHE_READ_ONLY");
        env::remove_var("CACHE_BACKGROUND_REFRESH_INTERVAL");
        env::remove_var("CACHE_DEFAULT_EXPIRATION");
    }
}
