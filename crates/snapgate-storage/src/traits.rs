//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::io;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Storage backend unreachable: {0}")]
    Unreachable(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Byte stream accepted by writers. One tee branch is passed in as-is.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync>>;

/// Proof that an artifact was completely written and is visible under its final key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub key: String,
    pub url: String,
    pub bytes_written: u64,
}

/// Write handle returned by [`Storage::open_write`].
///
/// A writer is single use: it consumes one stream and either confirms the artifact
/// under its final key or leaves nothing behind there.
#[async_trait]
pub trait ArtifactWriter: Send {
    async fn write_stream(self: Box<Self>, stream: ByteStream) -> StorageResult<WriteReceipt>;
}

/// Storage abstraction trait
///
/// All storage backends (WebDAV, local filesystem) implement this trait so the
/// gateway can probe and persist artifacts without knowing the transport.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Check if an artifact exists under `key`.
    ///
    /// Errors are reported, never folded into `false`.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Publicly reachable URL for `key`. Deterministic; does not touch the backend.
    fn public_url(&self, key: &str) -> String;

    /// Acquire a writer for `key`.
    ///
    /// `content_length`, when known, is checked against the number of bytes
    /// actually received before the artifact is promoted.
    async fn open_write(
        &self,
        key: &str,
        content_type: &str,
        content_length: Option<u64>,
    ) -> StorageResult<Box<dyn ArtifactWriter>>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Cheap reachability check used by the health endpoint.
    async fn health_check(&self) -> StorageResult<()>;
}

/// Fail a write whose byte count disagrees with the announced length.
pub(crate) fn check_length(
    key: &str,
    expected: Option<u64>,
    written: u64,
) -> StorageResult<()> {
    match expected {
        Some(expected) if expected != written => Err(StorageError::UploadFailed(format!(
            "Incomplete write for {}: expected {} bytes, received {}",
            key, expected, written
        ))),
        _ => Ok(()),
    }
}
