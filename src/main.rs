//! Refresh Cache - demo daemon
//!
//! Runs a cache with one self-refreshing key and logs its activity until
//! interrupted.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde_json::json;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use refresh_cache::{spawn_cleanup_task, Config, RefreshCache, RefreshFn};

/// Main entry point for the refresh cache daemon.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache over the built-in memory store
/// 4. Start background TTL cleanup task
/// 5. Register a sample key with a refresh callback (arms background refresh)
/// 6. Wait for SIGINT/SIGTERM, then stop background tasks
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "refresh_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting refresh cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: default_expiration={}s, read_only={}, refresh_interval={}ms, refresh_min_ttl={}ms",
        config.default_expiration,
        config.read_only,
        config.background_refresh_interval,
        config.background_refresh_min_ttl
    );

    let cleanup_interval = config.cleanup_interval;
    let cache = RefreshCache::from_config(config);

    let cleanup_handle = spawn_cleanup_task(cache.clone(), cleanup_interval);
    info!("Background cleanup task started");

    let refresh = RefreshFn::new(|key| async move {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is before the Unix epoch")?;
        info!(key = %key, "Refreshing sample key");
        anyhow::Ok(json!({ "refreshed_at": now.as_secs() }))
    });
    cache
        .set("sample:clock", json!({ "refreshed_at": null }), None, Some(refresh))
        .await
        .context("failed to register sample key")?;
    info!(armed = cache.is_armed(), "Sample key registered");

    shutdown_signal().await?;

    cache.stop();
    cleanup_handle.abort();
    warn!("Background tasks stopped");

    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?
            .recv()
            .await;
        anyhow::Ok(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<anyhow::Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C, initiating shutdown...");
        }
        result = terminate => {
            result?;
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
    Ok(())
}
