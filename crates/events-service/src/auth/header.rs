//! Bearer token extraction from the Authorization header.

use crate::auth::failure::AuthFailure;

/// Extract the raw token from an `Authorization: Bearer <token>` header value.
///
/// The value is split on whitespace. Checks run in a fixed order: scheme
/// first, then a missing token, then extra parts. An empty or
/// whitespace-only header is treated as absent.
///
/// # Errors
///
/// - `HeaderMissing` - no header, or nothing but whitespace
/// - `SchemeNotBearer` - first part is not `bearer` (case-insensitive)
/// - `TokenMissing` - scheme present with no token
/// - `TooManyParts` - more than one value after the scheme
pub fn extract_bearer_token(authorization: Option<&str>) -> Result<&str, AuthFailure> {
    let mut parts = authorization
        .map(str::split_whitespace)
        .ok_or(AuthFailure::HeaderMissing)?;

    let scheme = parts.next().ok_or(AuthFailure::HeaderMissing)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        tracing::debug!(target: "events.auth.header", "Authorization scheme is not Bearer");
        return Err(AuthFailure::SchemeNotBearer);
    }

    let token = parts.next().ok_or_else(|| {
        tracing::debug!(target: "events.auth.header", "Bearer scheme without token");
        AuthFailure::TokenMissing
    })?;

    if parts.next().is_some() {
        tracing::debug!(target: "events.auth.header", "Authorization header has extra parts");
        return Err(AuthFailure::TooManyParts);
    }

    Ok(token)
}
