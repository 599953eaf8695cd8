//! HTTP routes for the events service.
//!
//! Defines the Axum router and application state.

use crate::auth::jwks::{HttpKeySetFetcher, KeySetCache, KeySetFetcher};
use crate::auth::jwt::TokenVerifier;
use crate::auth::permissions;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{require_permission, AuthGate};
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
///
/// The key cache is owned here and shared by handle with the verifier, the
/// readiness probe and the refresh task.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Signing key set cache.
    pub key_cache: Arc<KeySetCache>,

    /// Token verifier backed by `key_cache`.
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// Build state that fetches keys from the configured JWKS URL.
    pub fn new(config: Config) -> Self {
        let fetcher = Arc::new(HttpKeySetFetcher::new(
            config.jwks_url.clone(),
            config.jwks_fetch_timeout,
            config.jwks_fetch_retries,
        ));
        Self::with_fetcher(config, fetcher)
    }

    /// Build state around an explicit key set source.
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn KeySetFetcher>) -> Self {
        let key_cache = Arc::new(KeySetCache::new(fetcher, config.jwks_cache_ttl));
        let verifier = Arc::new(TokenVerifier::new(
            Arc::clone(&key_cache),
            &config.auth_settings(),
        ));

        Self {
            config,
            key_cache,
            verifier,
        }
    }

    /// A gate requiring `permission`, sharing this state's verifier.
    pub fn gate(&self, permission: &'static str) -> AuthGate {
        AuthGate::new(Arc::clone(&self.verifier), permission)
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` - Welcome message - public
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/ready` - Readiness probe (key set obtainable) - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/api/v1/me` - Current caller - requires `read:events`
/// - JSON 404 for unknown routes
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::welcome))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes, one gate per required permission
    let read_events_routes = Router::new()
        .route("/api/v1/me", get(handlers::get_me))
        .route_layer(middleware::from_fn_with_state(
            state.gate(permissions::READ_EVENTS),
            require_permission,
        ));

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    public_routes
        .merge(metrics_routes)
        .merge(read_events_routes)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
