//! Error types for application commands.

use leadgen_scanner::ScanError;
use serde::Serialize;

/// Serializable error returned by commands.
#[derive(Debug, Serialize)]
pub struct CommandError {
    /// Stable error code (e.g., "JOB_NOT_FOUND")
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Optional structured context
    pub details: Option<serde_json::Value>,
}

impl CommandError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<ScanError> for CommandError {
    fn from(err: ScanError) -> Self {
        let message = err.to_string();
        match err {
            ScanError::Validation(_) => Self::new("VALIDATION_ERROR", message),
            ScanError::NotFound { job_id } => Self::with_details(
                "JOB_NOT_FOUND",
                message,
                serde_json::json!({ "job_id": job_id }),
            ),
            ScanError::NotReady { job_id, state } => Self::with_details(
                "JOB_NOT_READY",
                message,
                serde_json::json!({ "job_id": job_id, "state": state }),
            ),
            ScanError::JobFailed { job_id, error } => Self::with_details(
                "JOB_FAILED",
                message,
                serde_json::json!({ "job_id": job_id, "error": error }),
            ),
            ScanError::AlreadyFinished { job_id, state } => Self::with_details(
                "JOB_ALREADY_FINISHED",
                message,
                serde_json::json!({ "job_id": job_id, "state": state }),
            ),
            ScanError::InvalidTransition { .. } | ScanError::JobFinalized { .. } => {
                Self::new("INVALID_STATE", message)
            }
            ScanError::Transport(_) => Self::new("FETCHER_ERROR", message),
            ScanError::Internal(_) => Self::new("INTERNAL_ERROR", message),
        }
    }
}
