//! Completion notification delivery
//!
//! Delivery is best effort: callers log failures and never retry.

pub mod line;

pub use line::LineNotifyClient;

use async_trait::async_trait;

/// Notification delivery errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Request(String),

    #[error("Notification rejected: {status} {body}")]
    Rejected { status: u16, body: String },

    #[error("Notification client configuration error: {0}")]
    Config(String),
}

/// A channel that can deliver a short text message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, message: &str) -> Result<(), NotifyError>;
}

/// Notifier used when no notification channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send_message(&self, message: &str) -> Result<(), NotifyError> {
        tracing::debug!(message_len = message.len(), "Notifications disabled, dropping message");
        Ok(())
    }
}
