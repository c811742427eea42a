//! Construction of the gateway and its collaborators.

use anyhow::{Context, Result};
use snapgate_core::Config;
use snapgate_infra::{LineNotifyClient, NoopNotifier, Notifier};
use snapgate_services::{Gateway, GatewayOptions, HttpSnapGenerator, NotificationDispatcher};
use snapgate_storage::create_storage;
use std::sync::Arc;

pub async fn initialize_gateway(config: &Config) -> Result<Gateway> {
    let storage = create_storage(&config.storage)
        .await
        .context("Failed to initialize storage backend")?;

    let generator = HttpSnapGenerator::new(config.gateway.generation_base_url.clone())
        .context("Failed to initialize generation client")?;

    let notifier = build_notifier(config)?;

    let options = GatewayOptions::from(&config.gateway);
    tracing::info!(
        generation_base_url = %config.gateway.generation_base_url,
        generation_timeout_secs = options.generation_timeout.as_secs(),
        tee_buffer_chunks = options.tee_buffer_chunks,
        "Gateway initialized"
    );

    Ok(Gateway::new(
        storage,
        Arc::new(generator),
        NotificationDispatcher::new(notifier),
        options,
    ))
}

fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    match &config.notify.line_push_token {
        Some(token) => {
            let client = LineNotifyClient::new(config.notify.line_push_base_url.clone(), token.clone())
                .context("Failed to initialize notification client")?;
            Ok(Arc::new(client))
        }
        None => {
            tracing::warn!("LINE_PUSH_TOKEN not set, completion notifications disabled");
            Ok(Arc::new(NoopNotifier))
        }
    }
}
