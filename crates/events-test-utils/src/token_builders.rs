//! Builder patterns for test data construction
//!
//! Provides a fluent API for access token claims accepted by the test server.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Identity provider domain used by test configurations.
pub const TEST_DOMAIN: &str = "tenant.events.test";

/// Issuer matching [`TEST_DOMAIN`].
pub const TEST_ISSUER: &str = "https://tenant.events.test/";

/// Audience expected by test configurations.
pub const TEST_AUDIENCE: &str = "https://events.test/api";

/// Builder for creating test JWT claims
///
/// Defaults produce claims the test server accepts, minus any permissions.
///
/// # Example
/// ```rust,ignore
/// let claims = TestClaimsBuilder::new()
///     .for_user("auth0|alice")
///     .with_permissions(&["read:events"])
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestClaimsBuilder {
    claims: Map<String, Value>,
}

impl TestClaimsBuilder {
    /// Create a new claims builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert("sub".to_string(), json!("auth0|test-subject"));
        claims.insert("aud".to_string(), json!(TEST_AUDIENCE));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        Self { claims }
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    /// Set the permissions list
    pub fn with_permissions(self, permissions: &[&str]) -> Self {
        self.with_claim("permissions", json!(permissions))
    }

    /// Set the issuer
    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    /// Set the audience (string form)
    pub fn with_audience(self, audience: &str) -> Self {
        self.with_claim("aud", json!(audience))
    }

    /// Set the audience (list form)
    pub fn with_audiences(self, audiences: &[&str]) -> Self {
        self.with_claim("aud", json!(audiences))
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("exp", json!(exp))
    }

    /// Set issued-at timestamp
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.with_claim("iat", json!(timestamp))
    }

    /// Set an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }
}

impl Default for TestClaimsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creates_acceptable_claims() {
        let claims = TestClaimsBuilder::new()
            .for_user("alice")
            .with_permissions(&["read:events"])
            .build();

        assert_eq!(claims["sub"], "alice");
        assert_eq!(claims["iss"], TEST_ISSUER);
        assert_eq!(claims["aud"], TEST_AUDIENCE);
        assert_eq!(claims["permissions"], json!(["read:events"]));
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_builder_default_has_no_permissions() {
        let claims = TestClaimsBuilder::default().build();
        assert!(claims.get("permissions").is_none());
    }

    #[test]
    fn test_expired_and_removed_claims() {
        let claims = TestClaimsBuilder::new()
            .expires_in(-60)
            .without_claim("aud")
            .build();

        assert!(claims["exp"].as_i64().unwrap() < Utc::now().timestamp());
        assert!(claims.get("aud").is_none());
    }

    #[test]
    fn test_issuer_matches_domain() {
        assert_eq!(TEST_ISSUER, format!("https://{TEST_DOMAIN}/"));
    }
}
