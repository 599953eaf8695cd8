//! Test server harness for E2E testing
//!
//! Provides `TestEventsServer` for spawning a real events server whose
//! identity provider JWKS endpoint is a local mock.

use crate::crypto_fixtures::{jwks_json, TestSigningKey};
use crate::token_builders::{TEST_AUDIENCE, TEST_DOMAIN};
use events_service::config::Config;
use events_service::observability::metrics::init_metrics_recorder;
use events_service::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock identity provider serves its key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Environment for a test configuration pointing at `jwks_url`.
///
/// Retries are disabled so failure tests do not wait on backoff.
pub fn test_config_vars(jwks_url: &str) -> HashMap<String, String> {
    HashMap::from([
        ("AUTH0_DOMAIN".to_string(), TEST_DOMAIN.to_string()),
        ("ALGORITHMS".to_string(), "RS256".to_string()),
        ("API_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
        ("JWKS_URL".to_string(), jwks_url.to_string()),
        ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ("JWKS_FETCH_RETRIES".to_string(), "0".to_string()),
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
    ])
}

/// Test configuration pointing at `jwks_url`.
pub fn test_config(jwks_url: &str) -> Result<Config, anyhow::Error> {
    Config::from_vars(&test_config_vars(jwks_url))
        .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))
}

/// Start a mock identity provider publishing `keys`.
pub async fn mock_jwks_server(keys: &[TestSigningKey]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(keys)))
        .mount(&server)
        .await;
    server
}

/// Metrics handle for a test router.
///
/// Installing the global recorder can only happen once per process; later
/// callers get a standalone recorder's handle.
pub fn test_metrics_handle() -> PrometheusHandle {
    match init_metrics_recorder() {
        Ok(handle) => handle,
        Err(_) => PrometheusBuilder::new().build_recorder().handle(),
    }
}

/// Test harness for spawning the events server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_me_flow() -> Result<()> {
///     let server = TestEventsServer::spawn(&[TestSigningKey::a()]).await?;
///     let token = TestSigningKey::a().sign(&TestClaimsBuilder::new().build())?;
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/api/v1/me", server.url()))
///         .bearer_auth(token)
///         .send()
///         .await?;
///     Ok(())
/// }
/// ```
pub struct TestEventsServer {
    addr: SocketAddr,
    config: Config,
    state: Arc<AppState>,
    jwks_server: MockServer,
    _handle: JoinHandle<()>,
}

impl TestEventsServer {
    /// Spawn a server whose identity provider publishes `keys`.
    pub async fn spawn(keys: &[TestSigningKey]) -> Result<Self, anyhow::Error> {
        let jwks_server = mock_jwks_server(keys).await;
        Self::spawn_with_jwks_server(jwks_server).await
    }

    /// Spawn a server whose identity provider answers with `response`.
    pub async fn spawn_with_jwks_response(
        response: ResponseTemplate,
    ) -> Result<Self, anyhow::Error> {
        let jwks_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&jwks_server)
            .await;
        Self::spawn_with_jwks_server(jwks_server).await
    }

    /// Spawn a server against an already configured mock identity provider.
    pub async fn spawn_with_jwks_server(jwks_server: MockServer) -> Result<Self, anyhow::Error> {
        let config = test_config(&format!("{}{}", jwks_server.uri(), JWKS_PATH))?;
        let state = Arc::new(AppState::new(config.clone()));

        let app = routes::build_routes(state.clone(), test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            state,
            jwks_server,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the shared application state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Get reference to the mock identity provider.
    pub fn jwks_server(&self) -> &MockServer {
        &self.jwks_server
    }
}

impl Drop for TestEventsServer {
    fn drop(&mut self) {
        // Abort the HTTP server task when the test completes.
        self._handle.abort();
    }
}
