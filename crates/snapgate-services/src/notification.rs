use std::sync::Arc;

use snapgate_core::constants::SNAP_NOTIFICATION_TEMPLATE;
use snapgate_infra::Notifier;
use tokio::task::JoinHandle;

/// Fire-and-forget delivery of completion messages.
///
/// Failures are logged and dropped. Nothing waits on delivery unless it holds
/// on to the returned handle.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Message announcing a newly stored snapshot.
    pub fn snap_message(url: &str) -> String {
        SNAP_NOTIFICATION_TEMPLATE.replace("{url}", url)
    }

    pub fn notify(&self, message: String) -> JoinHandle<()> {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            match notifier.send_message(&message).await {
                Ok(()) => tracing::info!("Completion notification sent"),
                Err(e) => tracing::error!(error = %e, "Failed to send completion notification"),
            }
        })
    }
}
