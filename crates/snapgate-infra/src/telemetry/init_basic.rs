use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (already mapped from
/// `LOG_LEVEL`) applies to the snapgate crates and HTTP tracing.
pub fn init_telemetry(default_level: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "snapgate_api={level},snapgate_services={level},snapgate_storage={level},snapgate_infra={level},tower_http={level}",
            level = default_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    tracing::debug!(json, "Tracing initialized");
    Ok(())
}

pub async fn shutdown_telemetry() {
    tracing::debug!("Telemetry shutdown");
}
