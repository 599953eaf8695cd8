//! JWT utilities shared across the events platform.
//!
//! This module provides the framework-independent parts of token handling:
//! - Size limits for DoS prevention
//! - Expiry leeway bounds
//! - Key ID extraction from JWT headers (no signature verification)
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing extracted here is trusted until the signature has been verified
//!   against a key from the identity provider's key set
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_kid, MAX_JWT_SIZE_BYTES};
//!
//! // Extract key ID for JWKS lookup
//! let kid = extract_kid(token)?;
//! let key = key_set.get(&kid);
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Identity-provider access tokens with a permissions claim are typically
/// 700-1500 bytes. Anything above this limit is rejected before any base64
/// decode or signature work is attempted.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default expiry leeway: none.
///
/// Expiry is compared against the verifier's wall clock exactly unless a
/// deployment opts into a leeway window.
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(0);

/// Maximum configurable expiry leeway (10 minutes).
///
/// Guards against a misconfiguration that would keep expired tokens usable
/// for an unreasonable amount of time.
pub const MAX_LEEWAY: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting an unverified JWT header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("token exceeds {MAX_JWT_SIZE_BYTES} bytes")]
    TokenTooLarge,

    /// Token format is invalid (not three segments, bad base64, bad JSON).
    #[error("token is not a well-formed JWT")]
    MalformedToken,

    /// Token header has no usable `kid`.
    #[error("token header has no key id")]
    MissingKid,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// The key ID selects which published signing key should verify the token.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the token signature
/// - The `kid` value must only be used for lookup in a trusted key set
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - Wrong structure, bad base64, or invalid header JSON
/// - `MissingKid` - Header has no `kid`, or it is not a non-empty string
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn token_with_header(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        format!("{header_b64}.payload.signature")
    }

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_leeway_bounds() {
        assert_eq!(DEFAULT_LEEWAY, Duration::ZERO);
        assert_eq!(MAX_LEEWAY, Duration::from_secs(600));
    }

    #[test]
    fn test_extract_kid_valid_token() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":"abc123"}"#);
        assert_eq!(extract_kid(&token).unwrap(), "abc123");
    }

    #[test]
    fn test_extract_kid_missing_kid() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT"}"#);
        assert_eq!(extract_kid(&token), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_extract_kid_non_string_kid() {
        let token = token_with_header(r#"{"alg":"RS256","kid":12345}"#);
        assert_eq!(extract_kid(&token), Err(JwtValidationError::MissingKid));

        let token = token_with_header(r#"{"alg":"RS256","kid":null}"#);
        assert_eq!(extract_kid(&token), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_extract_kid_empty_kid() {
        let token = token_with_header(r#"{"alg":"RS256","kid":""}"#);
        assert_eq!(extract_kid(&token), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_extract_kid_wrong_segment_count() {
        assert_eq!(
            extract_kid("not-a-jwt"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(
            extract_kid("only.two"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(
            extract_kid("a.b.c.d"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(extract_kid(""), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_extract_kid_invalid_base64() {
        assert_eq!(
            extract_kid("!!!invalid!!!.payload.signature"),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_extract_kid_invalid_json() {
        let token = token_with_header("not-json");
        assert_eq!(extract_kid(&token), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_extract_kid_oversized_token() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(extract_kid(&token), Err(JwtValidationError::TokenTooLarge));
    }

    #[test]
    fn test_extract_kid_at_size_limit_is_parsed() {
        let header_b64 = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"k1"}"#);
        let prefix = format!("{header_b64}.payload.");
        let padding = "s".repeat(MAX_JWT_SIZE_BYTES - prefix.len());
        let token = format!("{prefix}{padding}");

        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);
        assert_eq!(extract_kid(&token).unwrap(), "k1");
    }
}
