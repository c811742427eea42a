//! Snapgate Storage Library
//!
//! This crate provides the storage abstraction for generated artifacts and its
//! WebDAV and local filesystem implementations.
//!
//! # Storage key format
//!
//! Artifacts live under `snap/{dir}/{id}.{ext}`. Keys must not contain `..` or a
//! leading `/`.
//!
//! # Write atomicity
//!
//! Writers stream into a temporary sibling key and promote it to the final key only
//! once the whole stream was written, so an existence check never observes a
//! half-written artifact.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod traits;
#[cfg(feature = "storage-webdav")]
pub mod webdav;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use snapgate_core::StorageBackend;
pub use traits::{ArtifactWriter, ByteStream, Storage, StorageError, StorageResult, WriteReceipt};
#[cfg(feature = "storage-webdav")]
pub use webdav::WebDavStorage;
