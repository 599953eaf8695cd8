//! Access token verification.
//!
//! Verifies RS-family JWTs against the identity provider's published keys.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (via `common::jwt::extract_kid`)
//! - Only algorithms on the configured allow-list are accepted, and the
//!   allow-list may only contain RSA algorithms
//! - The selected key must be an RSA signing key
//! - Expiry is checked before audience and issuer
//! - Client-facing descriptions never include library error text

use crate::auth::claims::Claims;
use crate::auth::failure::{AuthError, AuthFailure};
use crate::auth::jwks::{KeySetCache, SigningKey};
use common::jwt::extract_kid;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Expected token properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    /// Signature algorithms accepted in the token header.
    pub algorithms: Vec<Algorithm>,

    /// Required `aud` value.
    pub audience: String,

    /// Required `iss` value.
    pub issuer: String,

    /// Clock tolerance applied to `exp`.
    pub leeway: Duration,
}

/// Whether `alg` verifies with an RSA public key.
pub fn is_rsa_algorithm(alg: Algorithm) -> bool {
    matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

/// Verifies bearer tokens and returns their claims.
pub struct TokenVerifier {
    key_cache: Arc<KeySetCache>,
    validation: Validation,
    issuer: String,
    audience: String,
}

impl TokenVerifier {
    /// Create a verifier backed by `key_cache`.
    pub fn new(key_cache: Arc<KeySetCache>, settings: &AuthSettings) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = settings.algorithms.clone();
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.leeway = settings.leeway.as_secs();
        validation.validate_exp = true;

        Self {
            key_cache,
            validation,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
        }
    }

    pub fn key_cache(&self) -> &Arc<KeySetCache> {
        &self.key_cache
    }

    /// Verify a raw token and return its claims.
    ///
    /// # Steps
    ///
    /// 1. Read the `kid` from the token header (size-checked)
    /// 2. Take a snapshot of the key set, fetching it if needed
    /// 3. Select the key with that `kid`
    /// 4. Verify signature, algorithm, `exp`, `aud` and `iss`
    ///
    /// # Errors
    ///
    /// - `AuthError::Rejected` - the token was rejected
    /// - `AuthError::KeySetUnavailable` - the key set could not be obtained
    #[instrument(skip_all, name = "events.auth.verify")]
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let kid = extract_kid(token).map_err(|e| {
            tracing::debug!(target: "events.auth.jwt", error = %e, "Token header rejected");
            AuthFailure::MalformedToken
        })?;

        let key_set = self.key_cache.snapshot().await?;

        let key = key_set.get(&kid).ok_or_else(|| {
            tracing::debug!(target: "events.auth.jwt", kid = %kid, "No key matches token kid");
            AuthFailure::KeyNotFound
        })?;

        let claims = self.verify_with_key(token, key)?;
        tracing::debug!(target: "events.auth.jwt", kid = %kid, "Token verified");
        Ok(claims)
    }

    /// Verify `token` against one specific key.
    ///
    /// # Errors
    ///
    /// Returns the `AuthFailure` describing why the token was rejected.
    pub fn verify_with_key(&self, token: &str, key: &SigningKey) -> Result<Claims, AuthFailure> {
        let decoding_key = self.decoding_key(key)?;

        let token_data =
            decode::<Value>(token, &decoding_key, &self.validation).map_err(|e| {
                let failure = classify_decode_error(e.kind());
                tracing::debug!(
                    target: "events.auth.jwt",
                    kid = %key.kid,
                    error = %e,
                    failure = ?failure,
                    "Token verification failed"
                );
                failure
            })?;

        let payload = token_data.claims;
        // The library skips `iss`/`aud` values it cannot parse and accepts
        // an `iss` list, so both are checked again on the raw payload.
        if !matches_issuer(&payload, &self.issuer)
            || !matches_audience(&payload, &self.audience)
        {
            tracing::debug!(target: "events.auth.jwt", "Token issuer or audience does not match");
            return Err(AuthFailure::IncorrectClaims);
        }

        serde_json::from_value::<Claims>(payload).map_err(|e| {
            tracing::debug!(target: "events.auth.jwt", error = %e, "Token payload has unexpected shape");
            AuthFailure::Unverifiable
        })
    }

    fn decoding_key(&self, key: &SigningKey) -> Result<DecodingKey, AuthFailure> {
        if key.kty != "RSA" {
            tracing::warn!(target: "events.auth.jwt", kid = %key.kid, kty = %key.kty, "Unexpected JWK key type");
            return Err(AuthFailure::Unverifiable);
        }

        if let Some(key_use) = &key.key_use {
            if key_use != "sig" {
                tracing::warn!(target: "events.auth.jwt", kid = %key.kid, key_use = %key_use, "JWK is not a signing key");
                return Err(AuthFailure::Unverifiable);
            }
        }

        if let Some(alg) = &key.alg {
            let allowed = Algorithm::from_str(alg)
                .is_ok_and(|alg| self.validation.algorithms.contains(&alg));
            if !allowed {
                tracing::warn!(target: "events.auth.jwt", kid = %key.kid, alg = %alg, "JWK algorithm not allowed");
                return Err(AuthFailure::Unverifiable);
            }
        }

        let (Some(n), Some(e)) = (key.n.as_deref(), key.e.as_deref()) else {
            tracing::error!(target: "events.auth.jwt", kid = %key.kid, "RSA JWK missing modulus or exponent");
            return Err(AuthFailure::Unverifiable);
        };

        DecodingKey::from_rsa_components(n, e).map_err(|err| {
            tracing::error!(target: "events.auth.jwt", kid = %key.kid, error = %err, "Invalid RSA key encoding");
            AuthFailure::Unverifiable
        })
    }
}

/// `iss` must be a single string equal to `issuer`.
fn matches_issuer(payload: &Value, issuer: &str) -> bool {
    payload.get("iss").and_then(Value::as_str) == Some(issuer)
}

/// `aud` must be a string equal to `audience`, or a list of strings
/// containing it.
fn matches_audience(payload: &Value, audience: &str) -> bool {
    match payload.get("aud") {
        Some(Value::String(aud)) => aud == audience,
        Some(Value::Array(auds)) => {
            auds.iter().all(Value::is_string) && auds.iter().any(|aud| aud == audience)
        }
        _ => false,
    }
}

fn classify_decode_error(kind: &ErrorKind) -> AuthFailure {
    match kind {
        ErrorKind::ExpiredSignature => AuthFailure::TokenExpired,
        ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => AuthFailure::IncorrectClaims,
        ErrorKind::MissingRequiredClaim(claim) if claim == "aud" || claim == "iss" => {
            AuthFailure::IncorrectClaims
        }
        _ => AuthFailure::Unverifiable,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::{JwksDocument, KeySetError, KeySetFetcher};
    use async_trait::async_trait;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use serde_json::json;

    const FAKE_N: &str = "nKsDTYh7tRLqV7jFP9wBw5XUmCRPAE1CNEwnZ78Zt9mwoGMco6U2oqrAovlpWJjd";

    struct StaticFetcher(Result<JwksDocument, KeySetError>);

    #[async_trait]
    impl KeySetFetcher for StaticFetcher {
        async fn fetch(&self) -> Result<JwksDocument, KeySetError> {
            self.0.clone()
        }
    }

    fn rsa_key(kid: &str) -> SigningKey {
        SigningKey {
            kty: "RSA".to_string(),
            kid: kid.to_string(),
            key_use: Some("sig".to_string()),
            n: Some(FAKE_N.to_string()),
            e: Some("AQAB".to_string()),
            alg: Some("RS256".to_string()),
        }
    }

    fn settings() -> AuthSettings {
        AuthSettings {
            algorithms: vec![Algorithm::RS256],
            audience: "events-api".to_string(),
            issuer: "https://tenant.example.com/".to_string(),
            leeway: Duration::ZERO,
        }
    }

    fn verifier(fetched: Result<JwksDocument, KeySetError>) -> TokenVerifier {
        let cache = KeySetCache::new(Arc::new(StaticFetcher(fetched)), Duration::from_secs(60));
        TokenVerifier::new(Arc::new(cache), &settings())
    }

    fn unsigned_token(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header.as_bytes());
        let payload = r#"{"iss":"https://tenant.example.com/","aud":"events-api","exp":9999999999}"#;
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        format!("{header_b64}.{payload_b64}.fake_signature")
    }

    #[test]
    fn test_rsa_algorithm_family() {
        for alg in [
            Algorithm::RS256,
            Algorithm::RS384,
            Algorithm::RS512,
            Algorithm::PS256,
            Algorithm::PS384,
            Algorithm::PS512,
        ] {
            assert!(is_rsa_algorithm(alg), "{alg:?}");
        }
        for alg in [Algorithm::HS256, Algorithm::ES256, Algorithm::EdDSA] {
            assert!(!is_rsa_algorithm(alg), "{alg:?}");
        }
    }

    #[test]
    fn test_issuer_must_be_exact_string() {
        let issuer = "https://tenant.example.com/";
        assert!(matches_issuer(&json!({ "iss": issuer }), issuer));
        assert!(!matches_issuer(&json!({}), issuer));
        assert!(!matches_issuer(&json!({ "iss": 42 }), issuer));
        assert!(!matches_issuer(&json!({ "iss": [issuer] }), issuer));
        assert!(!matches_issuer(&json!({ "iss": "https://tenant.example.com" }), issuer));
    }

    #[test]
    fn test_audience_shapes() {
        assert!(matches_audience(&json!({ "aud": "events-api" }), "events-api"));
        assert!(matches_audience(&json!({ "aud": ["other", "events-api"] }), "events-api"));
        assert!(!matches_audience(&json!({}), "events-api"));
        assert!(!matches_audience(&json!({ "aud": 7 }), "events-api"));
        assert!(!matches_audience(&json!({ "aud": ["other"] }), "events-api"));
        assert!(!matches_audience(&json!({ "aud": ["events-api", 7] }), "events-api"));
        assert!(!matches_audience(&json!({ "aud": { "id": "events-api" } }), "events-api"));
    }

    #[test]
    fn test_decode_error_classification() {
        assert_eq!(
            classify_decode_error(&ErrorKind::ExpiredSignature),
            AuthFailure::TokenExpired
        );
        assert_eq!(
            classify_decode_error(&ErrorKind::InvalidAudience),
            AuthFailure::IncorrectClaims
        );
        assert_eq!(
            classify_decode_error(&ErrorKind::InvalidIssuer),
            AuthFailure::IncorrectClaims
        );
        assert_eq!(
            classify_decode_error(&ErrorKind::MissingRequiredClaim("iss".to_string())),
            AuthFailure::IncorrectClaims
        );
        assert_eq!(
            classify_decode_error(&ErrorKind::MissingRequiredClaim("exp".to_string())),
            AuthFailure::Unverifiable
        );
        assert_eq!(
            classify_decode_error(&ErrorKind::InvalidSignature),
            AuthFailure::Unverifiable
        );
        assert_eq!(
            classify_decode_error(&ErrorKind::InvalidAlgorithm),
            AuthFailure::Unverifiable
        );
    }

    #[tokio::test]
    async fn test_malformed_token_is_rejected_before_fetch() {
        // The fetcher would fail; a malformed token must not reach it.
        let verifier = verifier(Err(KeySetError::Timeout));

        for token in ["", "not-a-jwt", "a.b", "!!!.payload.sig"] {
            let err = verifier.verify(token).await.unwrap_err();
            assert!(
                matches!(err, AuthError::Rejected(AuthFailure::MalformedToken)),
                "{token:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_token_without_kid_is_malformed() {
        let verifier = verifier(Ok(JwksDocument { keys: vec![rsa_key("a")] }));
        let token = unsigned_token(r#"{"alg":"RS256","typ":"JWT"}"#);

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(AuthFailure::MalformedToken)));
    }

    #[tokio::test]
    async fn test_unknown_kid_is_key_not_found() {
        let verifier = verifier(Ok(JwksDocument { keys: vec![rsa_key("b")] }));
        let token = unsigned_token(r#"{"alg":"RS256","typ":"JWT","kid":"a"}"#);

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(AuthFailure::KeyNotFound)));
    }

    #[tokio::test]
    async fn test_key_set_failure_is_not_a_rejection() {
        let verifier = verifier(Err(KeySetError::Status(503)));
        let token = unsigned_token(r#"{"alg":"RS256","typ":"JWT","kid":"a"}"#);

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::KeySetUnavailable(KeySetError::Status(503))
        ));
    }

    #[tokio::test]
    async fn test_bad_signature_is_unverifiable() {
        let verifier = verifier(Ok(JwksDocument { keys: vec![rsa_key("a")] }));
        let token = unsigned_token(r#"{"alg":"RS256","typ":"JWT","kid":"a"}"#);

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(AuthFailure::Unverifiable)));
    }

    #[test]
    fn test_non_rsa_key_is_unverifiable() {
        let verifier = verifier(Err(KeySetError::Timeout));
        let key = SigningKey {
            kty: "OKP".to_string(),
            n: None,
            e: None,
            alg: None,
            ..rsa_key("a")
        };
        let token = unsigned_token(r#"{"alg":"RS256","typ":"JWT","kid":"a"}"#);

        assert_eq!(
            verifier.verify_with_key(&token, &key).unwrap_err(),
            AuthFailure::Unverifiable
        );
    }

    #[test]
    fn test_encryption_key_is_unverifiable() {
        let verifier = verifier(Err(KeySetError::Timeout));
        let key = SigningKey {
            key_use: Some("enc".to_string()),
            ..rsa_key("a")
        };
        let token = unsigned_token(r#"{"alg":"RS256","typ":"JWT","kid":"a"}"#);

        assert_eq!(
            verifier.verify_with_key(&token, &key).unwrap_err(),
            AuthFailure::Unverifiable
        );
    }

    #[test]
    fn test_key_algorithm_outside_allow_list_is_unverifiable() {
        let verifier = verifier(Err(KeySetError::Timeout));
        for alg in ["RS512", "HS256", "nonsense"] {
            let key = SigningKey {
                alg: Some(alg.to_string()),
                ..rsa_key("a")
            };
            let token = unsigned_token(r#"{"alg":"RS256","typ":"JWT","kid":"a"}"#);

            assert_eq!(
                verifier.verify_with_key(&token, &key).unwrap_err(),
                AuthFailure::Unverifiable,
                "{alg}"
            );
        }
    }

    #[test]
    fn test_key_missing_modulus_is_unverifiable() {
        let verifier = verifier(Err(KeySetError::Timeout));
        let key = SigningKey {
            n: None,
            ..rsa_key("a")
        };
        let token = unsigned_token(r#"{"alg":"RS256","typ":"JWT","kid":"a"}"#);

        assert_eq!(
            verifier.verify_with_key(&token, &key).unwrap_err(),
            AuthFailure::Unverifiable
        );
    }

    #[test]
    fn test_header_algorithm_outside_allow_list_is_unverifiable() {
        let verifier = verifier(Err(KeySetError::Timeout));
        let key = SigningKey {
            alg: None,
            ..rsa_key("a")
        };

        for header in [
            r#"{"alg":"HS256","typ":"JWT","kid":"a"}"#,
            r#"{"alg":"none","typ":"JWT","kid":"a"}"#,
            r#"{"alg":"PS256","typ":"JWT","kid":"a"}"#,
        ] {
            let token = unsigned_token(header);
            assert_eq!(
                verifier.verify_with_key(&token, &key).unwrap_err(),
                AuthFailure::Unverifiable,
                "{header}"
            );
        }
    }
}
