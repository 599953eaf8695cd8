//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks that the signing key set is obtainable

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 when the key set is cached or can be fetched, 503 otherwise.
/// Error details are logged server-side only.
#[tracing::instrument(skip_all, name = "events.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.key_cache.snapshot().await {
        Ok(key_set) => {
            tracing::debug!(target: "events.health", key_count = key_set.len(), "Readiness check passed");
            (
                StatusCode::OK,
                Json(ReadinessResponse {
                    status: "ready",
                    jwks: Some("healthy"),
                    error: None,
                }),
            )
        }
        Err(e) => {
            tracing::warn!(target: "events.health", error = %e, "Readiness check failed: JWKS unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    jwks: Some("unavailable"),
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}
