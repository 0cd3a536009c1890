//! Handler error types

use thiserror::Error;

/// Errors an attempt handler can raise
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Recoverable fault (I/O hiccup, device timeout); the attempt may be retried
    #[error("Transient handler failure: {0}")]
    Transient(String),

    /// Unrecoverable fault; the run must stop
    #[error("Fatal handler failure: {0}")]
    Fatal(String),
}

impl HandlerError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, HandlerError::Transient(_))
    }
}
