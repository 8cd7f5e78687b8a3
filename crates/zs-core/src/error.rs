//! # AppError
//!
//! Centralized error type for ZSki. Two kinds exist: the caller sent
//! something unusable, or a backend (database, blob store) failed. The
//! message is shown to the client verbatim, so `Display` is the bare text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Client input failure (e.g., missing upload file, malformed form)
    #[error("{0}")]
    ValidationError(String),

    /// Infrastructure failure (e.g., DB down, bucket unreachable)
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn missing_file() -> Self {
        Self::ValidationError("No file provided".to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A specialized Result type for ZSki logic.
pub type Result<T> = std::result::Result<T, AppError>;
