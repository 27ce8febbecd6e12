//! Error types for trapwise
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in trapwise
#[derive(Debug, Error)]
pub enum TrapwiseError {
    /// Generation backend call failed or timed out
    #[error("Backend error: {0}")]
    Backend(String),

    /// Content failed schema or style validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Prompt template error (unknown version, render failure)
    #[error("Template error: {0}")]
    Template(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for TrapwiseError {
    fn from(err: rusqlite::Error) -> Self {
        TrapwiseError::Storage(err.to_string())
    }
}

/// Result type alias for trapwise operations
pub type Result<T> = std::result::Result<T, TrapwiseError>;
