//! Snapgate API Library
//!
//! This crate provides the HTTP handlers, route setup, and application wiring.

mod api_doc;
mod handlers;

pub mod error;
pub mod setup;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
