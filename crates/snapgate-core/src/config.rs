//! Configuration module
//!
//! All settings come from the process environment (optionally seeded from a `.env`
//! file). Parsing is written against a lookup function so it can be exercised
//! without touching the real environment.

use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_GENERATION_TIMEOUT_SECS, DEFAULT_NOTIFY_BASE_URL, DEFAULT_PORT,
    DEFAULT_TEE_BUFFER_CHUNKS,
};
use crate::storage_types::StorageBackend;

const LOG_LEVELS: [&str; 7] = ["fatal", "error", "warn", "info", "debug", "trace", "silent"];

/// Storage backend settings
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub webdav_url: Option<String>,
    pub webdav_username: Option<String>,
    pub webdav_password: Option<String>,
    pub webdav_base_path: String,
    pub webdav_share_base_url: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
}

/// Completion notification settings. Without a token notifications are disabled.
#[derive(Clone, Debug)]
pub struct NotifyConfig {
    pub line_push_token: Option<String>,
    pub line_push_base_url: String,
}

/// Generation backend and pipeline settings
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub generation_base_url: String,
    pub generation_timeout_secs: u64,
    pub tee_buffer_chunks: usize,
}

impl GatewayConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    pub log_json: bool,
    pub storage: StorageConfig,
    pub notify: NotifyConfig,
    pub gateway: GatewayConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let log_level = var("LOG_LEVEL")
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| "info".to_string());
        if !LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(anyhow::anyhow!(
                "LOG_LEVEL must be one of {}",
                LOG_LEVELS.join(", ")
            ));
        }

        let log_json = var("LOG_FORMAT")
            .map(|s| s.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let cors_origins = var("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = match var("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            None => DEFAULT_PORT,
        };

        let backend = match var("STORAGE_BACKEND") {
            Some(s) => s.parse::<StorageBackend>()?,
            None => StorageBackend::WebDav,
        };

        let storage = StorageConfig {
            backend,
            webdav_url: var("WEBDAV_URL"),
            webdav_username: var("WEBDAV_USERNAME"),
            webdav_password: var("WEBDAV_PASSWORD"),
            webdav_base_path: var("WEBDAV_BASE_PATH").unwrap_or_else(|| "/".to_string()),
            webdav_share_base_url: var("WEBDAV_SHARE_BASE_URL"),
            local_storage_path: var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: var("LOCAL_STORAGE_BASE_URL"),
        };

        let notify = NotifyConfig {
            line_push_token: var("LINE_PUSH_TOKEN"),
            line_push_base_url: var("LINE_PUSH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_NOTIFY_BASE_URL.to_string()),
        };

        let gateway = GatewayConfig {
            generation_base_url: var("TWITTER_SNAP_API_BASEURL").ok_or_else(|| {
                anyhow::anyhow!("TWITTER_SNAP_API_BASEURL must be set to the generation backend")
            })?,
            generation_timeout_secs: match var("GENERATION_TIMEOUT_SECS") {
                Some(s) => s
                    .parse()
                    .map_err(|_| anyhow::anyhow!("GENERATION_TIMEOUT_SECS must be a number"))?,
                None => DEFAULT_GENERATION_TIMEOUT_SECS,
            },
            tee_buffer_chunks: match var("TEE_BUFFER_CHUNKS") {
                Some(s) => s
                    .parse()
                    .map_err(|_| anyhow::anyhow!("TEE_BUFFER_CHUNKS must be a number"))?,
                None => DEFAULT_TEE_BUFFER_CHUNKS,
            },
        };

        Ok(Config {
            server_port,
            environment,
            cors_origins,
            log_level,
            log_json,
            storage,
            notify,
            gateway,
        })
    }

    /// Check cross-field requirements that depend on the selected backend.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage.backend {
            StorageBackend::WebDav => {
                for (name, value) in [
                    ("WEBDAV_URL", &self.storage.webdav_url),
                    ("WEBDAV_USERNAME", &self.storage.webdav_username),
                    ("WEBDAV_PASSWORD", &self.storage.webdav_password),
                    ("WEBDAV_SHARE_BASE_URL", &self.storage.webdav_share_base_url),
                ] {
                    if value.is_none() {
                        return Err(anyhow::anyhow!(
                            "{} must be set when STORAGE_BACKEND=webdav",
                            name
                        ));
                    }
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none()
                    || self.storage.local_storage_base_url.is_none()
                {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL must be set when STORAGE_BACKEND=local"
                    ));
                }
            }
        }

        if self.gateway.generation_timeout_secs == 0 {
            return Err(anyhow::anyhow!("GENERATION_TIMEOUT_SECS must be greater than 0"));
        }
        if self.gateway.tee_buffer_chunks == 0 {
            return Err(anyhow::anyhow!("TEE_BUFFER_CHUNKS must be greater than 0"));
        }
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// `tracing` filter directive for the configured `LOG_LEVEL`.
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.as_str() {
            "fatal" | "error" => "error",
            "warn" => "warn",
            "debug" => "debug",
            "trace" => "trace",
            "silent" => "off",
            _ => "info",
        }
    }
}
