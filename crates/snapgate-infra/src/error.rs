//! JSON body for failed requests
//!
//! The `IntoResponse` implementation lives in the API crate: the orphan rule forbids
//! implementing `axum::IntoResponse` for `snapgate_core::AppError` here.

use serde::Serialize;
use snapgate_core::{AppError, ErrorMetadata};
use utoipa::ToSchema;

/// Body returned with every 4xx/5xx from the gateway.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Client-safe message
    pub error: String,
    /// Error chain; omitted in production and for sensitive errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Stable code such as `GENERATION_TIMEOUT`
    pub code: String,
    /// True when the same request may succeed later
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    /// Render `err`, including its source chain only when `with_details` is set.
    pub fn from_app_error(err: &AppError, with_details: bool) -> Self {
        let with_details = with_details && !err.is_sensitive();
        Self {
            error: err.client_message(),
            details: with_details.then(|| err.detailed_message()),
            error_type: with_details.then(|| err.error_type().to_string()),
            code: err.error_code().to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_only_for_non_sensitive_errors() {
        let body = ErrorResponse::from_app_error(&AppError::InvalidInput("bad id".into()), true);
        assert_eq!(body.code, "INVALID_INPUT");
        assert_eq!(body.error_type.as_deref(), Some("InvalidInput"));
        assert!(body.details.is_some());

        let body =
            ErrorResponse::from_app_error(&AppError::StorageUnavailable("dav: 401".into()), true);
        assert!(body.details.is_none());
        assert!(!body.error.contains("401"));
    }

    #[test]
    fn test_details_suppressed_on_request() {
        let body = ErrorResponse::from_app_error(&AppError::GenerationTimeout { seconds: 5 }, false);
        assert!(body.details.is_none());
        assert!(body.error_type.is_none());
        assert!(body.recoverable);
        assert!(body.suggested_action.is_some());
    }
}
