//! Error types module
//!
//! Every error that can reach an HTTP client is an [`AppError`]. Each variant
//! carries a fixed [`ErrorProfile`] describing how it is presented and logged;
//! [`ErrorMetadata`] exposes that profile to the API layer.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Caller mistakes such as a malformed path
    Debug,
    /// Upstream trouble that usually resolves on retry
    Warn,
    /// Failures an operator should look at
    Error,
}

/// How an error is presented to clients
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "GENERATION_FAILED")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request may succeed
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show to clients
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Generation timed out after {seconds}s")]
    GenerationTimeout { seconds: u64 },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

/// Static presentation of one error kind.
#[derive(Debug, Clone, Copy)]
pub struct ErrorProfile {
    pub status: u16,
    pub code: &'static str,
    pub recoverable: bool,
    pub suggested_action: Option<&'static str>,
    pub sensitive: bool,
    pub log_level: LogLevel,
}

const RETRY_SHORTLY: Option<&str> = Some("Retry after a short delay");

const INVALID_INPUT: ErrorProfile = ErrorProfile {
    status: 400,
    code: "INVALID_INPUT",
    recoverable: false,
    suggested_action: Some("Check dir and id and try again"),
    sensitive: false,
    log_level: LogLevel::Debug,
};

const STORAGE_UNAVAILABLE: ErrorProfile = ErrorProfile {
    status: 503,
    code: "STORAGE_UNAVAILABLE",
    recoverable: true,
    suggested_action: RETRY_SHORTLY,
    sensitive: true,
    log_level: LogLevel::Error,
};

const GENERATION_FAILED: ErrorProfile = ErrorProfile {
    status: 502,
    code: "GENERATION_FAILED",
    recoverable: true,
    suggested_action: RETRY_SHORTLY,
    sensitive: true,
    log_level: LogLevel::Error,
};

const GENERATION_TIMEOUT: ErrorProfile = ErrorProfile {
    status: 504,
    code: "GENERATION_TIMEOUT",
    recoverable: true,
    suggested_action: Some("Wait 30-60 seconds and retry"),
    sensitive: false,
    log_level: LogLevel::Warn,
};

const INTERNAL_ERROR: ErrorProfile = ErrorProfile {
    status: 500,
    code: "INTERNAL_ERROR",
    recoverable: true,
    suggested_action: RETRY_SHORTLY,
    sensitive: true,
    log_level: LogLevel::Error,
};

impl AppError {
    pub fn profile(&self) -> &'static ErrorProfile {
        match self {
            AppError::InvalidInput(_) => &INVALID_INPUT,
            AppError::StorageUnavailable(_) => &STORAGE_UNAVAILABLE,
            AppError::Generation(_) => &GENERATION_FAILED,
            AppError::GenerationTimeout { .. } => &GENERATION_TIMEOUT,
            AppError::Internal(_) | AppError::InternalWithSource { .. } => &INTERNAL_ERROR,
        }
    }

    /// Variant name, shown in non-production error bodies
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::StorageUnavailable(_) => "StorageUnavailable",
            AppError::Generation(_) => "Generation",
            AppError::GenerationTimeout { .. } => "GenerationTimeout",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Display text followed by up to five levels of `Caused by:` lines.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut source = self.source();
        for depth in 1.. {
            let Some(err) = source else { break };
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        self.profile().status
    }

    fn error_code(&self) -> &'static str {
        self.profile().code
    }

    fn is_recoverable(&self) -> bool {
        self.profile().recoverable
    }

    fn suggested_action(&self) -> Option<&'static str> {
        self.profile().suggested_action
    }

    fn is_sensitive(&self) -> bool {
        self.profile().sensitive
    }

    fn log_level(&self) -> LogLevel {
        self.profile().log_level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::StorageUnavailable(_) => "Failed to access storage".to_string(),
            AppError::Generation(_) => "Failed to generate snapshot".to_string(),
            AppError::GenerationTimeout { seconds } => {
                format!("Snapshot generation timed out after {}s", seconds)
            }
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_is_client_error() {
        let err = AppError::InvalidInput("bad dir".to_string());
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "bad dir");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_storage_unavailable_hides_details() {
        let err = AppError::StorageUnavailable("connection refused".to_string());
        assert_eq!(err.http_status_code(), 503);
        assert_eq!(err.error_code(), "STORAGE_UNAVAILABLE");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access storage");
        assert!(err.is_sensitive());
    }

    #[test]
    fn test_generation_failures() {
        let err = AppError::Generation("upstream returned 500".to_string());
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.error_code(), "GENERATION_FAILED");
        assert_eq!(err.log_level(), LogLevel::Error);

        let err = AppError::GenerationTimeout { seconds: 30 };
        assert_eq!(err.http_status_code(), 504);
        assert!(err.client_message().contains("30"));
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("root cause").context("outer"));
        let details = err.detailed_message();
        assert!(details.starts_with("Internal error with source"));
        assert!(details.contains("Caused by: outer"));
    }
}
