//! Public root and fallback handlers.

use crate::errors::ApiError;
use crate::models::WelcomeResponse;
use axum::Json;

/// Handler for GET /
pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        success: true,
        message: "Welcome to the events API.".to_string(),
    })
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("resource not found".to_string())
}
