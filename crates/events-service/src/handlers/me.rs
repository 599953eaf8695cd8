//! Current caller handler.
//!
//! Returns the caller's identity and permissions from the verified claims.

use crate::auth::Claims;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for `/api/v1/me`.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub success: bool,

    /// Subject (user or client ID).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Granted permission strings.
    pub permissions: Vec<String>,

    /// Token expiration timestamp.
    pub exp: i64,

    /// Token issued-at timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Handler for GET /api/v1/me
///
/// Requires `read:events` via the permission gate.
///
/// ## Response
///
/// ```json
/// {
///   "success": true,
///   "sub": "auth0|abc123",
///   "permissions": ["read:events"],
///   "exp": 1234567890,
///   "iat": 1234567800
/// }
/// ```
#[instrument(skip_all, name = "events.handlers.me")]
pub async fn get_me(Extension(claims): Extension<Claims>) -> Json<MeResponse> {
    tracing::debug!(target: "events.handlers.me", "Returning caller claims");

    Json(MeResponse {
        success: true,
        permissions: claims.permissions().map(<[String]>::to_vec).unwrap_or_default(),
        sub: claims.sub,
        exp: claims.exp,
        iat: claims.iat,
    })
}
