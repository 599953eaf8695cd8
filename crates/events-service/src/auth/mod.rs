//! Authentication and authorization for the events API.
//!
//! The pipeline for a protected request is:
//!
//! ```text
//! header::extract_bearer_token -> jwt::TokenVerifier::verify -> permissions::check_permission
//! ```
//!
//! `jwks::KeySetCache` supplies the signing keys the verifier checks against.

pub mod claims;
pub mod failure;
pub mod header;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::{Audience, Claims};
pub use failure::{AuthError, AuthErrorCode, AuthFailure};
pub use header::extract_bearer_token;
pub use jwks::{HttpKeySetFetcher, KeySet, KeySetCache, KeySetError, KeySetFetcher, SigningKey};
pub use jwt::{AuthSettings, TokenVerifier};
pub use permissions::check_permission;
