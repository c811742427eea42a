//! Snapgate Infrastructure Library
//!
//! This crate provides shared infrastructure components:
//! - Middleware (security headers)
//! - Telemetry initialization
//! - Error response body
//! - Completion notification delivery

#[cfg(feature = "middleware")]
pub mod middleware;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

#[cfg(feature = "notify")]
pub mod notify;

// Re-export commonly used types
#[cfg(feature = "middleware")]
pub use middleware::{security_headers_middleware, SecurityHeaders};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};

pub use error::ErrorResponse;

#[cfg(feature = "notify")]
pub use notify::{LineNotifyClient, NoopNotifier, NotifyError, Notifier};
