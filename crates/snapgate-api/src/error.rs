//! Rendering of handler errors.
//!
//! Handlers return `Result<_, HttpAppError>`; anything convertible into
//! `AppError` converts into it, so every failure gets the same status mapping,
//! JSON body and log line.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use snapgate_core::{AppError, Config, ErrorMetadata, LogLevel};
use snapgate_services::GatewayError;
use std::sync::atomic::{AtomicBool, Ordering};

pub use snapgate_infra::ErrorResponse;

/// Newtype so this crate can implement `IntoResponse` for core's `AppError`.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<GatewayError> for HttpAppError {
    fn from(err: GatewayError) -> Self {
        Self(err.into())
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        Self(err.into())
    }
}

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Apply the error detail policy of `config`: error chains are shown outside production.
pub fn configure(config: &Config) {
    EXPOSE_DETAILS.store(!config.is_production(), Ordering::Relaxed);
}

fn expose_details() -> bool {
    EXPOSE_DETAILS.load(Ordering::Relaxed)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let kind = err.error_type();

        match err.log_level() {
            LogLevel::Debug => tracing::debug!(error = %err, kind, "Request rejected"),
            LogLevel::Warn => tracing::warn!(error = %err, kind, "Request failed"),
            LogLevel::Error => tracing::error!(error = %err, kind, "Request failed"),
        }

        let body = ErrorResponse::from_app_error(&err, expose_details());
        (status, Json(body)).into_response()
    }
}
