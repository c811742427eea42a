//! Route configuration and setup.
//!
//! The health check lives in [health](health).

pub mod health;

use crate::api_doc::ApiDoc;
use crate::error;
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::get,
    Json, Router,
};
use snapgate_core::Config;
use snapgate_infra::{security_headers_middleware, SecurityHeaders};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    error::configure(config);

    let app = Router::new()
        .route("/api/snap/{dir}/{id}", get(handlers::snap::get_snap))
        .route("/health", get(health::health_check))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(RapiDoc::new("/openapi.json").path("/docs"))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(
            SecurityHeaders::from_config(config),
            security_headers_middleware,
        ))
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
