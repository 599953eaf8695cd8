//! Classified authentication and authorization failures.
//!
//! Every rejection produced by the auth pipeline is exactly one [`AuthFailure`].
//! Each variant carries a symbolic [`AuthErrorCode`], an HTTP status from
//! {400, 401, 403}, and a fixed human-readable description (its `Display`).
//! Descriptions never include text from the underlying JWT library.

use crate::auth::jwks::KeySetError;
use axum::http::StatusCode;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Symbolic error code exposed to callers for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCode {
    AuthorizationHeaderMissing,
    InvalidHeader,
    TokenExpired,
    InvalidClaims,
    Unauthorized,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::AuthorizationHeaderMissing => "authorization_header_missing",
            AuthErrorCode::InvalidHeader => "invalid_header",
            AuthErrorCode::TokenExpired => "token_expired",
            AuthErrorCode::InvalidClaims => "invalid_claims",
            AuthErrorCode::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A credential rejection.
///
/// Variants sharing a code are distinguishable by description only; callers
/// must treat them identically apart from logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// No Authorization header on the request.
    #[error("Authorization header is expected.")]
    HeaderMissing,

    /// Header scheme is not (case-insensitively) `Bearer`.
    #[error("Authorization header must start with \"Bearer\".")]
    SchemeNotBearer,

    /// `Bearer` with nothing after it.
    #[error("Token not found.")]
    TokenMissing,

    /// More than one whitespace-separated value after the scheme.
    #[error("Authorization header must be bearer token.")]
    TooManyParts,

    /// Token header could not be read or declares no key id.
    #[error("Authorization malformed.")]
    MalformedToken,

    /// Declared key id is not in the current key set.
    #[error("Unable to find the appropriate key.")]
    KeyNotFound,

    /// Signature, algorithm, key material, or payload could not be verified.
    #[error("Unable to parse authentication token.")]
    Unverifiable,

    /// `exp` is in the past.
    #[error("Token expired.")]
    TokenExpired,

    /// `aud` or `iss` does not match configuration.
    #[error("Incorrect claims. Please, check the audience and issuer.")]
    IncorrectClaims,

    /// Verified token has no `permissions` claim.
    #[error("Permissions not included in JWT.")]
    PermissionsMissing,

    /// Required permission is absent from the `permissions` claim.
    #[error("Permission not found.")]
    PermissionNotFound,
}

impl AuthFailure {
    /// Symbolic code for this failure.
    pub fn code(&self) -> AuthErrorCode {
        match self {
            AuthFailure::HeaderMissing => AuthErrorCode::AuthorizationHeaderMissing,
            AuthFailure::SchemeNotBearer
            | AuthFailure::TokenMissing
            | AuthFailure::TooManyParts
            | AuthFailure::MalformedToken
            | AuthFailure::KeyNotFound
            | AuthFailure::Unverifiable => AuthErrorCode::InvalidHeader,
            AuthFailure::TokenExpired => AuthErrorCode::TokenExpired,
            AuthFailure::IncorrectClaims | AuthFailure::PermissionsMissing => {
                AuthErrorCode::InvalidClaims
            }
            AuthFailure::PermissionNotFound => AuthErrorCode::Unauthorized,
        }
    }

    /// HTTP status for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthFailure::HeaderMissing
            | AuthFailure::SchemeNotBearer
            | AuthFailure::TokenMissing
            | AuthFailure::TooManyParts
            | AuthFailure::MalformedToken
            | AuthFailure::TokenExpired
            | AuthFailure::IncorrectClaims => StatusCode::UNAUTHORIZED,
            AuthFailure::KeyNotFound
            | AuthFailure::Unverifiable
            | AuthFailure::PermissionsMissing => StatusCode::BAD_REQUEST,
            AuthFailure::PermissionNotFound => StatusCode::FORBIDDEN,
        }
    }

    /// Human-readable description, safe to return to clients.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

/// Outcome of a failed auth pipeline evaluation.
///
/// `Rejected` is a credential problem (400/401/403). `KeySetUnavailable` is an
/// infrastructure problem and must never be reported as a credential rejection.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Rejected(#[from] AuthFailure),

    #[error("signing key set unavailable: {0}")]
    KeySetUnavailable(#[from] KeySetError),
}

impl AuthError {
    /// Label used for decision metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            AuthError::Rejected(failure) => failure.code().as_str(),
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
        }
    }
}
