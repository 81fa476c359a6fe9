use thiserror::Error;

/// Result type for engine, scan and apply operations.
pub type Result<T> = std::result::Result<T, SweepError>;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Invalid find term: {0}")]
    InvalidTerm(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Malformed field '{field}': {reason}")]
    MalformedField { field: String, reason: String },

    #[error("{failed} of {total} changes failed to apply")]
    PartialApplyFailure { failed: usize, total: usize },

    #[error("Replacement term '{term}' rejected by brand guidelines: {reason}")]
    TermRejected {
        term: String,
        reason: String,
        suggestions: Vec<String>,
    },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SweepError {
    /// Errors raised by the storage collaborator. These abort a scan.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            SweepError::StorageUnavailable(_) | SweepError::Timeout { .. } | SweepError::Http(_)
        )
    }
}
