//! Constants shared across crates.

/// Top-level storage namespace for generated artifacts: `snap/{dir}/{id}.{ext}`.
pub const ARTIFACT_NAMESPACE: &str = "snap";

/// Default LINE Notify endpoint.
pub const DEFAULT_NOTIFY_BASE_URL: &str = "https://notify-api.line.me/api/notify";

/// Message sent once an artifact has been persisted. `{url}` is replaced with its public URL.
pub const SNAP_NOTIFICATION_TEMPLATE: &str = "スナップしました\n{url}";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_TEE_BUFFER_CHUNKS: usize = 16;
