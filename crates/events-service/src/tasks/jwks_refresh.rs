//! JWKS refresh background task.
//!
//! Periodically replaces the cached key set so that key rotation at the
//! identity provider is picked up without waiting for the cache TTL. A failed
//! refresh leaves the previous key set in place.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is triggered.

use crate::auth::jwks::KeySetCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Start the JWKS refresh background task.
///
/// The first refresh runs immediately, then once per `interval`.
///
/// # Arguments
///
/// * `key_cache` - Cache to refresh
/// * `interval` - Time between refreshes
/// * `cancel_token` - Token for graceful shutdown
///
/// # Returns
///
/// Returns when the cancellation token is triggered.
#[instrument(skip_all, name = "events.task.jwks_refresh")]
pub async fn start_jwks_refresh(
    key_cache: Arc<KeySetCache>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        target: "events.task.jwks_refresh",
        interval_seconds = interval.as_secs(),
        "Starting JWKS refresh task"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match key_cache.force_refresh().await {
                    Ok(key_set) => {
                        tracing::debug!(
                            target: "events.task.jwks_refresh",
                            key_count = key_set.len(),
                            "JWKS refreshed"
                        );
                    }
                    Err(e) => {
                        // Keep serving the previous set; the next tick retries.
                        warn!(
                            target: "events.task.jwks_refresh",
                            error = %e,
                            "JWKS refresh failed, keeping previous key set"
                        );
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "events.task.jwks_refresh",
                    "JWKS refresh task received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "events.task.jwks_refresh", "JWKS refresh task stopped");
}
