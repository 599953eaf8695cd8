//! HTTP-facing error type for the events service.
//!
//! Every error renders as `{"success": false, "error": <status>, "message": ...}`
//! with the same transport status. Credential rejections carry their own
//! status and description; infrastructure errors are logged server-side and
//! returned with a generic message.

use crate::auth::failure::{AuthError, AuthFailure};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Client message for any key set failure.
pub const KEY_SET_UNAVAILABLE_MESSAGE: &str = "Authentication service unavailable.";

/// Events service error type.
///
/// Maps to HTTP status codes:
/// - Auth: the failure's own 400/401/403
/// - NotFound: 404 Not Found
/// - ServiceUnavailable: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(failure) => failure.status_code(),
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Rejected(failure) => ApiError::Auth(failure),
            AuthError::KeySetUnavailable(e) => ApiError::ServiceUnavailable(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Auth(failure) => failure.description(),
            ApiError::NotFound(resource) => resource.clone(),
            ApiError::ServiceUnavailable(reason) => {
                // Log actual reason server-side
                tracing::warn!(target: "events.availability", reason = %reason, "Service unavailable");
                KEY_SET_UNAVAILABLE_MESSAGE.to_string()
            }
        };

        let body = ErrorResponse {
            success: false,
            error: status.as_u16(),
            message,
        };

        let mut response = (status, Json(body)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"events-api\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::jwks::KeySetError;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_into_response_header_missing() {
        let response = ApiError::Auth(AuthFailure::HeaderMissing).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let www_auth = response.headers().get("WWW-Authenticate").unwrap();
        assert!(www_auth.to_str().unwrap().starts_with("Bearer"));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(
            body_json,
            serde_json::json!({
                "success": false,
                "error": 401,
                "message": "Authorization header is expected."
            })
        );
    }

    #[tokio::test]
    async fn test_into_response_key_not_found() {
        let response = ApiError::Auth(AuthFailure::KeyNotFound).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], 400);
        assert_eq!(body_json["message"], "Unable to find the appropriate key.");
    }

    #[tokio::test]
    async fn test_into_response_permission_not_found() {
        let response = ApiError::Auth(AuthFailure::PermissionNotFound).into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["error"], 403);
        assert_eq!(body_json["message"], "Permission not found.");
    }

    #[tokio::test]
    async fn test_key_set_failure_renders_generic_503() {
        let error = ApiError::from(AuthError::KeySetUnavailable(KeySetError::Transport(
            "connection refused to 10.0.0.1".to_string(),
        )));
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], 503);
        assert_eq!(body_json["message"], KEY_SET_UNAVAILABLE_MESSAGE);
        assert!(!body_json.to_string().contains("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let response = ApiError::NotFound("resource not found".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], 404);
        assert_eq!(body_json["message"], "resource not found");
    }

    #[test]
    fn test_rejection_keeps_failure() {
        let error = ApiError::from(AuthError::Rejected(AuthFailure::TokenExpired));
        assert!(matches!(error, ApiError::Auth(AuthFailure::TokenExpired)));
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(error.to_string(), "Token expired.");
    }
}
