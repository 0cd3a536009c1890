//! Ledger error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or appending to a ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pattern key '{0}': must be non-empty and contain no commas or whitespace")]
    InvalidKey(String),
}

impl LedgerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Reasons a persisted line could not be turned back into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Expected 3 fields, found {0}")]
    FieldCount(usize),

    #[error("Empty pattern key")]
    EmptyKey,

    #[error("Unknown outcome: {0}")]
    UnknownOutcome(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    #[error("Line is not valid UTF-8")]
    Encoding,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_message_names_path() {
        let err = LedgerError::io(
            "/tmp/ledger/paths_log.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        let msg = err.to_string();
        assert!(msg.contains("/tmp/ledger/paths_log.csv"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_field_count_message() {
        assert_eq!(ParseError::FieldCount(2).to_string(), "Expected 3 fields, found 2");
    }
}
