//! Permission gate for protected routes.
//!
//! An [`AuthGate`] is bound to one required permission when the route is
//! registered. For every request it runs, in order:
//!
//! 1. Bearer token extraction from the Authorization header
//! 2. Token verification against the current key set
//! 3. Permission check on the verified claims
//!
//! The first failure wins. On success the verified claims are handed to the
//! protected operation.

use crate::auth::{check_permission, extract_bearer_token, AuthError, Claims, TokenVerifier};
use crate::errors::ApiError;
use crate::observability::metrics::record_auth_decision;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

/// Guard requiring one permission. Holds no mutable state and is cheap to
/// clone, so one gate can serve concurrent requests.
#[derive(Clone)]
pub struct AuthGate {
    verifier: Arc<TokenVerifier>,
    permission: &'static str,
}

impl AuthGate {
    pub fn new(verifier: Arc<TokenVerifier>, permission: &'static str) -> Self {
        Self {
            verifier,
            permission,
        }
    }

    /// The permission this gate requires.
    pub fn permission(&self) -> &'static str {
        self.permission
    }

    /// Authenticate and authorize a request from its Authorization header value.
    ///
    /// # Errors
    ///
    /// - `AuthError::Rejected` - first failing check in the pipeline
    /// - `AuthError::KeySetUnavailable` - the signing keys could not be loaded
    #[instrument(skip_all, name = "events.auth.gate", fields(permission = %self.permission))]
    pub async fn authorize(&self, authorization: Option<&str>) -> Result<Claims, AuthError> {
        let result = self.evaluate(authorization).await;

        match &result {
            Ok(_) => {
                tracing::debug!(target: "events.auth.gate", permission = %self.permission, "Request authorized");
                record_auth_decision(self.permission, "allowed");
            }
            Err(AuthError::Rejected(failure)) => {
                tracing::info!(
                    target: "events.auth.gate",
                    permission = %self.permission,
                    code = %failure.code(),
                    reason = %failure,
                    "Request rejected"
                );
                record_auth_decision(self.permission, failure.code().as_str());
            }
            Err(err @ AuthError::KeySetUnavailable(_)) => {
                tracing::error!(
                    target: "events.auth.gate",
                    permission = %self.permission,
                    error = %err,
                    "Cannot authorize request"
                );
                record_auth_decision(self.permission, err.outcome());
            }
        }

        result
    }

    /// Run `operation` with the verified claims if the request is authorized.
    ///
    /// The operation is never invoked when any check fails.
    ///
    /// # Errors
    ///
    /// Same as [`AuthGate::authorize`].
    pub async fn run<F, Fut, T>(
        &self,
        authorization: Option<&str>,
        operation: F,
    ) -> Result<T, AuthError>
    where
        F: FnOnce(Claims) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self.authorize(authorization).await?;
        Ok(operation(claims).await)
    }

    async fn evaluate(&self, authorization: Option<&str>) -> Result<Claims, AuthError> {
        let token = extract_bearer_token(authorization)?;
        let claims = self.verifier.verify(token).await?;
        check_permission(self.permission, &claims)?;
        Ok(claims)
    }
}

/// Middleware enforcing an [`AuthGate`] before the route handler.
///
/// On success the claims are inserted into request extensions, where the
/// handler takes them with `Extension<Claims>`.
///
/// # Response
///
/// - 400/401/403 with the failure's description when the request is rejected
/// - 503 when the signing keys are unavailable
pub async fn require_permission(
    State(gate): State<AuthGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Non-UTF8 values are passed on lossily and fail as malformed tokens.
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    let claims = gate.authorize(authorization.as_deref()).await?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::{JwksDocument, KeySetCache, KeySetError, KeySetFetcher};
    use crate::auth::{AuthFailure, AuthSettings};
    use async_trait::async_trait;
    use jsonwebtoken::Algorithm;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeySetFetcher for CountingFetcher {
        async fn fetch(&self) -> Result<JwksDocument, KeySetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(KeySetError::Status(500))
        }
    }

    fn gate_with(fetcher: Arc<CountingFetcher>) -> AuthGate {
        let cache = Arc::new(KeySetCache::new(fetcher, Duration::from_secs(60)));
        let settings = AuthSettings {
            algorithms: vec![Algorithm::RS256],
            audience: "events-api".to_string(),
            issuer: "https://tenant.example.com/".to_string(),
            leeway: Duration::ZERO,
        };
        AuthGate::new(Arc::new(TokenVerifier::new(cache, &settings)), "read:events")
    }

    fn counting_fetcher() -> Arc<CountingFetcher> {
        Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_auth_gate_is_clone() {
        fn assert_clone<T: Clone + Send + Sync>() {}
        assert_clone::<AuthGate>();
    }

    #[tokio::test]
    async fn test_header_failure_preempts_verification() {
        let fetcher = counting_fetcher();
        let gate = gate_with(fetcher.clone());

        for (header, expected) in [
            (None, AuthFailure::HeaderMissing),
            (Some("Basic abc"), AuthFailure::SchemeNotBearer),
            (Some("Bearer"), AuthFailure::TokenMissing),
            (Some("Bearer a b"), AuthFailure::TooManyParts),
        ] {
            let err = gate.authorize(header).await.unwrap_err();
            assert!(
                matches!(err, AuthError::Rejected(f) if f == expected),
                "{header:?} gave {err:?}"
            );
        }

        // No header failure reaches the key set.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_operation_not_invoked_on_failure() {
        let gate = gate_with(counting_fetcher());
        let invoked = AtomicBool::new(false);

        let result = gate
            .run(None, |_claims| async {
                invoked.store(true, Ordering::SeqCst);
            })
            .await;

        assert!(matches!(
            result,
            Err(AuthError::Rejected(AuthFailure::HeaderMissing))
        ));
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_key_set_failure_is_reported_separately() {
        let gate = gate_with(counting_fetcher());
        let token = "eyJhbGciOiJSUzI1NiIsImtpZCI6ImEifQ.e30.c2ln";

        let err = gate.authorize(Some(&format!("Bearer {token}"))).await.unwrap_err();
        assert!(matches!(err, AuthError::KeySetUnavailable(_)));
        assert_eq!(err.outcome(), "key_set_unavailable");
    }

    #[test]
    fn test_permission_accessor() {
        assert_eq!(gate_with(counting_fetcher()).permission(), "read:events");
    }
}
