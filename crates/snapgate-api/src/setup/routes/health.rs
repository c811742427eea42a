//! Health check handler and response type.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

const STORAGE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when storage answered, "degraded" otherwise
    pub status: String,
    pub timestamp: String,
    pub environment: String,
    /// Configured storage backend
    pub storage: String,
    /// "healthy", "timeout", or "unhealthy: {error}"
    pub storage_status: String,
    /// "idle" or "busy"
    pub generation_slot: String,
    /// Generated responses whose client disconnected before the last byte
    pub abandoned_streams: u64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Storage is unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = state.gateway.storage();

    let storage_status =
        match tokio::time::timeout(STORAGE_CHECK_TIMEOUT, storage.health_check()).await {
            Ok(Ok(())) => "healthy".to_string(),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Storage health check failed");
                format!("unhealthy: {}", e)
            }
            Err(_) => {
                tracing::warn!("Storage health check timed out");
                "timeout".to_string()
            }
        };
    let healthy = storage_status == "healthy";

    let generation_slot = if state.gateway.serializer().is_idle() {
        "idle"
    } else {
        "busy"
    };

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        environment: state.config.environment.clone(),
        storage: storage.backend_type().to_string(),
        storage_status,
        generation_slot: generation_slot.to_string(),
        abandoned_streams: state.gateway.abandoned_streams(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
