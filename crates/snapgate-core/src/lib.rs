//! Snapgate Core Library
//!
//! This crate provides the domain types, error types, configuration, and validation
//! shared by every Snapgate component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, GatewayConfig, NotifyConfig, StorageConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{ArtifactLocation, Encoding, ResourceKey};
pub use storage_types::StorageBackend;
