#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-webdav")]
use crate::WebDavStorage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use snapgate_core::StorageConfig;
use std::sync::Arc;

fn required<'a>(value: &'a Option<String>, name: &str) -> StorageResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| StorageError::ConfigError(format!("{} not configured", name)))
}

/// Create a storage backend based on configuration
pub async fn create_storage(config: &StorageConfig) -> StorageResult<Arc<dyn Storage>> {
    match config.backend {
        #[cfg(feature = "storage-webdav")]
        StorageBackend::WebDav => {
            let storage = WebDavStorage::new(
                required(&config.webdav_url, "WEBDAV_URL")?,
                &config.webdav_base_path,
                required(&config.webdav_share_base_url, "WEBDAV_SHARE_BASE_URL")?.to_string(),
                required(&config.webdav_username, "WEBDAV_USERNAME")?.to_string(),
                required(&config.webdav_password, "WEBDAV_PASSWORD")?.to_string(),
            )?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-webdav"))]
        StorageBackend::WebDav => Err(StorageError::ConfigError(
            "WebDAV storage backend not available (storage-webdav feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = required(&config.local_storage_path, "LOCAL_STORAGE_PATH")?;
            let base_url = required(&config.local_storage_base_url, "LOCAL_STORAGE_BASE_URL")?;

            let storage = LocalStorage::new(base_path, base_url.to_string()).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
