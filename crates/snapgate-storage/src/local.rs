use crate::keys::{join_url, temp_key, validate_key};
use crate::traits::{
    check_length, ArtifactWriter, ByteStream, Storage, StorageError, StorageResult, WriteReceipt,
};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for artifacts (e.g., "/var/lib/snapgate")
    /// * `base_url` - Base URL the directory is served from (e.g., "http://localhost:3000/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;
        Ok(self.base_path.join(storage_key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }

    async fn open_write(
        &self,
        key: &str,
        _content_type: &str,
        content_length: Option<u64>,
    ) -> StorageResult<Box<dyn ArtifactWriter>> {
        let final_path = self.key_to_path(key)?;
        let temp_path = self.key_to_path(&temp_key(key))?;

        self.ensure_parent_dir(&final_path).await?;

        let file = fs::File::create(&temp_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        Ok(Box::new(LocalWriter {
            file,
            temp_path,
            final_path,
            key: key.to_string(),
            url: self.public_url(key),
            content_length,
        }))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }

    async fn health_check(&self) -> StorageResult<()> {
        let meta = fs::metadata(&self.base_path).await?;
        if !meta.is_dir() {
            return Err(StorageError::ConfigError(format!(
                "{} is not a directory",
                self.base_path.display()
            )));
        }
        Ok(())
    }
}

struct LocalWriter {
    file: fs::File,
    temp_path: PathBuf,
    final_path: PathBuf,
    key: String,
    url: String,
    content_length: Option<u64>,
}

impl LocalWriter {
    async fn copy_into_temp(&mut self, mut stream: ByteStream) -> StorageResult<u64> {
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                StorageError::UploadFailed(format!("Source stream failed for {}: {}", self.key, e))
            })?;
            self.file.write_all(&chunk).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    self.temp_path.display(),
                    e
                ))
            })?;
            written += chunk.len() as u64;
        }

        self.file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to sync file {}: {}",
                self.temp_path.display(),
                e
            ))
        })?;

        check_length(&self.key, self.content_length, written)?;
        Ok(written)
    }
}

#[async_trait]
impl ArtifactWriter for LocalWriter {
    async fn write_stream(mut self: Box<Self>, stream: ByteStream) -> StorageResult<WriteReceipt> {
        let start = std::time::Instant::now();

        let written = match self.copy_into_temp(stream).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&self.temp_path).await {
                    tracing::warn!(
                        path = %self.temp_path.display(),
                        error = %cleanup,
                        "Failed to remove partial file"
                    );
                }
                return Err(e);
            }
        };

        fs::rename(&self.temp_path, &self.final_path)
            .await
            .map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to promote {} to {}: {}",
                    self.temp_path.display(),
                    self.final_path.display(),
                    e
                ))
            })?;

        tracing::info!(
            path = %self.final_path.display(),
            key = %self.key,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(WriteReceipt {
            key: self.key,
            url: self.url,
            bytes_written: written,
        })
    }
}
