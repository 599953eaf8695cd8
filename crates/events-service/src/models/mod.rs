//! Response models for the events service.

use serde::Serialize;

/// Readiness probe response.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: &'static str,

    /// Signing key set status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<&'static str>,

    /// Generic error description when not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Public welcome response for `/`.
#[derive(Debug, Clone, Serialize)]
pub struct WelcomeResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_response_omits_empty_fields() {
        let response = ReadinessResponse {
            status: "ready",
            jwks: Some("healthy"),
            error: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"status":"ready","jwks":"healthy"}"#);
    }

    #[test]
    fn test_welcome_response_serialization() {
        let response = WelcomeResponse {
            success: true,
            message: "hello".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "message": "hello"}));
    }
}
