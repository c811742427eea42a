//! Snapshot route: redirect to a stored artifact or stream a freshly generated one.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use snapgate_core::{AppError, ResourceKey};
use snapgate_services::GatewayResponse;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct SnapPath {
    /// Collection name, 1-100 characters of `[a-zA-Z0-9_]`
    pub dir: String,
    /// Numeric resource id, 1-19 digits
    pub id: String,
}

#[utoipa::path(
    get,
    path = "/api/snap/{dir}/{id}",
    tag = "snap",
    params(SnapPath),
    responses(
        (status = 200, description = "Freshly generated `image/png` or `video/mp4` artifact, streamed while it is being stored"),
        (status = 302, description = "Artifact already stored; `Location` points to it"),
        (status = 400, description = "Invalid dir or id", body = ErrorResponse),
        (status = 502, description = "Generation backend failed", body = ErrorResponse),
        (status = 503, description = "Storage could not be probed", body = ErrorResponse),
        (status = 504, description = "Generation backend timed out", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_snap"))]
pub async fn get_snap(
    State(state): State<Arc<AppState>>,
    Path(SnapPath { dir, id }): Path<SnapPath>,
) -> Result<Response, HttpAppError> {
    let key = ResourceKey::new(dir, id)?;

    match state.gateway.handle(&key).await? {
        GatewayResponse::Redirect { location } => {
            Ok((StatusCode::FOUND, [(header::LOCATION, location.url)]).into_response())
        }
        GatewayResponse::Generated {
            content_type,
            content_length,
            body,
            persist,
            ..
        } => {
            // Persistence outlives the response.
            drop(persist);

            let mut builder = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type);
            if let Some(length) = content_length {
                builder = builder.header(header::CONTENT_LENGTH, length);
            }

            builder.body(Body::from_stream(body)).map_err(|e| {
                tracing::error!(error = %e, "Failed to build response");
                HttpAppError::from(AppError::Internal(e.to_string()))
            })
        }
    }
}
