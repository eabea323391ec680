//! Query error types
//!
//! Every failure during planning or evaluation aborts the whole query.
//! Errors are never retried: evaluation is deterministic, so the same
//! inputs fail the same way every time.
//!
//! Error codes:
//! - SQLEVAL_NOT_FOUND
//! - SQLEVAL_PARSE_ERROR
//! - SQLEVAL_UNKNOWN_COLUMN
//! - SQLEVAL_AMBIGUOUS_COLUMN
//! - SQLEVAL_TYPE_MISMATCH
//! - SQLEVAL_UNKNOWN_FUNCTION
//! - SQLEVAL_AGGREGATE_OUTSIDE_GROUP
//! - SQLEVAL_INVALID_LIMIT
//! - SQLEVAL_DUPLICATE_OUTPUT_COLUMN
//! - SQLEVAL_NON_AGGREGATED_COLUMN

use std::fmt;

use crate::codec::DocumentError;

/// Query error codes, one per failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    /// Referenced table does not exist
    NotFound,
    /// Malformed query or table document
    ParseError,
    /// Column reference matches no column in scope
    UnknownColumn,
    /// Unqualified column reference matches more than one source
    AmbiguousColumn,
    /// Operator or function applied to unsupported value types
    TypeMismatch,
    /// Function name is not in the built-in set
    UnknownFunction,
    /// Aggregate evaluated against a plain row
    AggregateOutsideGroupContext,
    /// Negative LIMIT or OFFSET
    InvalidLimit,
    /// Two output columns share a name
    DuplicateOutputColumn,
    /// Plain column used in an aggregate query without being a group key
    NonAggregatedColumnWithoutGroupBy,
}

impl QueryErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::NotFound => "SQLEVAL_NOT_FOUND",
            QueryErrorCode::ParseError => "SQLEVAL_PARSE_ERROR",
            QueryErrorCode::UnknownColumn => "SQLEVAL_UNKNOWN_COLUMN",
            QueryErrorCode::AmbiguousColumn => "SQLEVAL_AMBIGUOUS_COLUMN",
            QueryErrorCode::TypeMismatch => "SQLEVAL_TYPE_MISMATCH",
            QueryErrorCode::UnknownFunction => "SQLEVAL_UNKNOWN_FUNCTION",
            QueryErrorCode::AggregateOutsideGroupContext => "SQLEVAL_AGGREGATE_OUTSIDE_GROUP",
            QueryErrorCode::InvalidLimit => "SQLEVAL_INVALID_LIMIT",
            QueryErrorCode::DuplicateOutputColumn => "SQLEVAL_DUPLICATE_OUTPUT_COLUMN",
            QueryErrorCode::NonAggregatedColumnWithoutGroupBy => "SQLEVAL_NON_AGGREGATED_COLUMN",
        }
    }

    /// Returns true for failures caused by the inputs rather than the query text
    pub fn is_input_error(&self) -> bool {
        matches!(self, QueryErrorCode::NotFound | QueryErrorCode::ParseError)
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query error with the offending name or expression text
#[derive(Debug, Clone, PartialEq)]
pub struct QueryError {
    code: QueryErrorCode,
    message: String,
    subject: Option<String>,
}

impl QueryError {
    fn new(code: QueryErrorCode, message: String, subject: Option<String>) -> Self {
        Self {
            code,
            message,
            subject,
        }
    }

    /// Referenced table is missing
    pub fn not_found(table: impl Into<String>) -> Self {
        let t = table.into();
        Self::new(
            QueryErrorCode::NotFound,
            format!("Table \"{}\" not found.", t),
            Some(t),
        )
    }

    /// Malformed document
    pub fn parse_error(reason: impl Into<String>) -> Self {
        Self::new(QueryErrorCode::ParseError, reason.into(), None)
    }

    /// Unqualified column that matches nothing
    pub fn unknown_column(name: impl Into<String>) -> Self {
        let n = name.into();
        Self::new(
            QueryErrorCode::UnknownColumn,
            format!("Unknown column \"{}\".", n),
            Some(n),
        )
    }

    /// Qualified column missing from its table
    pub fn unknown_column_in_table(name: impl Into<String>, table: &str) -> Self {
        let n = name.into();
        Self::new(
            QueryErrorCode::UnknownColumn,
            format!("Unknown column \"{}\" in table \"{}\".", n, table),
            Some(n),
        )
    }

    /// Qualifier that names no source in scope
    pub fn unknown_table(table: impl Into<String>) -> Self {
        let t = table.into();
        Self::new(
            QueryErrorCode::UnknownColumn,
            format!("Unknown table name \"{}\".", t),
            Some(t),
        )
    }

    /// ORDER BY position outside the select list
    pub fn unknown_position(position: i64, width: usize) -> Self {
        Self::new(
            QueryErrorCode::UnknownColumn,
            format!(
                "ORDER BY position {} is not in select list (1..={}).",
                position, width
            ),
            Some(position.to_string()),
        )
    }

    /// Unqualified column found in several sources
    pub fn ambiguous_column(name: impl Into<String>, sources: &[&str]) -> Self {
        let n = name.into();
        let listed = sources
            .iter()
            .map(|s| format!("\"{}\"", s))
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(
            QueryErrorCode::AmbiguousColumn,
            format!(
                "Column reference \"{}\" is ambiguous; present in multiple tables: {}.",
                n, listed
            ),
            Some(n),
        )
    }

    /// Operator applied to unsupported operand types
    pub fn incompatible_types(op: &str, left: &str, right: &str) -> Self {
        Self::new(
            QueryErrorCode::TypeMismatch,
            format!("Incompatible types to \"{}\": {} and {}.", op, left, right),
            Some(op.to_string()),
        )
    }

    /// Generic type mismatch
    pub fn type_mismatch(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            QueryErrorCode::TypeMismatch,
            reason.into(),
            Some(subject.into()),
        )
    }

    /// Function name outside the built-in set
    pub fn unknown_function(name: impl Into<String>) -> Self {
        let n = name.into();
        Self::new(
            QueryErrorCode::UnknownFunction,
            format!("Unknown function \"{}\".", n),
            Some(n),
        )
    }

    /// Aggregate evaluated in a non-group context
    pub fn aggregate_outside_group(expr: impl Into<String>) -> Self {
        let e = expr.into();
        Self::new(
            QueryErrorCode::AggregateOutsideGroupContext,
            format!("Aggregate \"{}\" is not allowed here.", e),
            Some(e),
        )
    }

    /// Negative LIMIT/OFFSET
    pub fn invalid_limit(clause: &str, value: i64) -> Self {
        Self::new(
            QueryErrorCode::InvalidLimit,
            format!("{} must be non-negative, got {}.", clause, value),
            Some(clause.to_string()),
        )
    }

    /// Output column name used twice
    pub fn duplicate_output_column(name: impl Into<String>) -> Self {
        let n = name.into();
        Self::new(
            QueryErrorCode::DuplicateOutputColumn,
            format!("Duplicate output column \"{}\".", n),
            Some(n),
        )
    }

    /// Plain column in an aggregate query that is not a group key
    pub fn non_aggregated_column(expr: impl Into<String>) -> Self {
        let e = expr.into();
        Self::new(
            QueryErrorCode::NonAggregatedColumnWithoutGroupBy,
            format!(
                "Column \"{}\" must appear in GROUP BY or be used in an aggregate.",
                e
            ),
            Some(e),
        )
    }

    /// Returns the error code
    pub fn code(&self) -> QueryErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending name or expression text, if any
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for QueryError {}

impl From<DocumentError> for QueryError {
    fn from(e: DocumentError) -> Self {
        match e {
            DocumentError::NotFound(name) => QueryError::not_found(name),
            other => QueryError::parse_error(other.to_string()),
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(QueryErrorCode::UnknownColumn.code(), "SQLEVAL_UNKNOWN_COLUMN");
        assert_eq!(
            QueryErrorCode::NonAggregatedColumnWithoutGroupBy.code(),
            "SQLEVAL_NON_AGGREGATED_COLUMN"
        );
        assert_eq!(QueryErrorCode::InvalidLimit.code(), "SQLEVAL_INVALID_LIMIT");
    }

    #[test]
    fn test_ambiguous_message_lists_sources() {
        let err = QueryError::ambiguous_column("id", &["a", "b"]);
        assert_eq!(err.code(), QueryErrorCode::AmbiguousColumn);
        assert_eq!(
            err.message(),
            "Column reference \"id\" is ambiguous; present in multiple tables: \"a\", \"b\"."
        );
        assert_eq!(err.subject(), Some("id"));
    }

    #[test]
    fn test_display_carries_code() {
        let err = QueryError::incompatible_types("+", "int", "str");
        let display = err.to_string();
        assert!(display.starts_with("SQLEVAL_TYPE_MISMATCH"));
        assert!(display.contains("Incompatible types to \"+\": int and str."));
    }

    #[test]
    fn test_document_not_found_maps_to_not_found() {
        let err: QueryError = DocumentError::NotFound("orders".into()).into();
        assert_eq!(err.code(), QueryErrorCode::NotFound);
        assert!(err.code().is_input_error());
    }
}
