//! Metrics definitions for the events service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `events_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `permission`: the fixed set in `auth::permissions`
//! - `outcome`: `allowed`, one of the five auth error codes, or `key_set_unavailable`
//! - `status`: `success` or `error`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return the handle used to
/// render the `/metrics` endpoint.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // JWKS fetches are bounded by a 1-60s timeout
        .set_buckets_for_metric(
            Matcher::Prefix("events_jwks_fetch".to_string()),
            &[0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record the result of evaluating a permission gate.
///
/// Metric: `events_auth_decisions_total`
/// Labels: `permission`, `outcome`
pub fn record_auth_decision(permission: &'static str, outcome: &'static str) {
    counter!("events_auth_decisions_total",
        "permission" => permission,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a JWKS fetch (including its retries).
///
/// Metric: `events_jwks_fetch_total`, `events_jwks_fetch_duration_seconds`
/// Labels: `status`
pub fn record_jwks_fetch(status: &'static str, duration: Duration) {
    histogram!("events_jwks_fetch_duration_seconds",
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("events_jwks_fetch_total",
        "status" => status
    )
    .increment(1);
}
