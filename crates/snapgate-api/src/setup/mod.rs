//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! so tests can build the same router around their own state.

pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::Result;
use snapgate_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Initialize telemetry first
    snapgate_infra::init_telemetry(config.log_filter(), config.log_json)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        storage_backend = %config.storage.backend,
        "Configuration loaded and validated successfully"
    );

    // Storage, generator, notifier and the gateway around them
    let gateway = services::initialize_gateway(&config).await?;

    let state = Arc::new(AppState {
        config: config.clone(),
        gateway,
    });

    // Setup routes
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
