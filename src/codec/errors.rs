//! Document errors
//!
//! Failures reading or decoding table and query documents. They convert
//! into [`QueryError`](crate::errors::QueryError) so the executor can
//! surface them like any other query failure.

use thiserror::Error;

/// Result type for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Table and query document errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// No table with this name exists
    #[error("Table \"{0}\" not found.")]
    NotFound(String),

    /// Document is not valid JSON or does not have the expected shape
    #[error("Malformed {kind} document: {reason}")]
    Parse { kind: &'static str, reason: String },

    /// Document exists but could not be read
    #[error("I/O error: {0}")]
    Io(String),
}

impl DocumentError {
    /// Malformed table document
    pub fn table(reason: impl Into<String>) -> Self {
        DocumentError::Parse {
            kind: "table",
            reason: reason.into(),
        }
    }

    /// Malformed query document
    pub fn query(reason: impl Into<String>) -> Self {
        DocumentError::Parse {
            kind: "query",
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            DocumentError::NotFound("orders".into()).to_string(),
            "Table \"orders\" not found."
        );
        assert_eq!(
            DocumentError::query("missing \"from\"").to_string(),
            "Malformed query document: missing \"from\""
        );
    }
}
