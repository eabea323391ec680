//! In-memory relation: ordered columns plus rows
//!
//! Invariant: every row has exactly `columns.len()` values, positionally
//! aligned with the column list. Tables are never mutated once built; each
//! stage produces a new one.

use std::collections::HashSet;

use crate::errors::{QueryError, QueryResult};
use crate::value::{DataType, Value};

/// One row of values, aligned with its table's columns
pub type Row = Vec<Value>;

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type; `None` means inferred from values
    pub data_type: Option<DataType>,
}

impl Column {
    /// Create a column with a declared type
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
        }
    }

    /// Create a column whose type is inferred
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }
}

/// A relation: ordered columns and rows of matching arity
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    /// Creates a table, validating arity and column name uniqueness.
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> QueryResult<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(QueryError::parse_error(format!(
                    "Duplicate column \"{}\" in table.",
                    column.name
                )));
            }
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(QueryError::parse_error(format!(
                    "Row {} has {} values, expected {}.",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
        }

        Ok(Self { columns, rows })
    }

    /// Builds an intermediate relation whose arity the caller guarantees.
    ///
    /// Joined relations may repeat column names across sources, so no
    /// uniqueness check is made here.
    pub(crate) fn from_parts(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    /// Creates a table with no rows
    pub fn empty(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of a column by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Consumes the table, returning its parts
    pub fn into_parts(self) -> (Vec<Column>, Vec<Row>) {
        (self.columns, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_is_validated() {
        let columns = vec![Column::new("a", DataType::Int), Column::untyped("b")];
        let err = Table::new(columns, vec![vec![Value::Int(1)]]).unwrap_err();
        assert!(err.message().contains("expected 2"));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let columns = vec![Column::untyped("a"), Column::untyped("a")];
        assert!(Table::new(columns, Vec::new()).is_err());
    }

    #[test]
    fn test_accessors() {
        let table = Table::new(
            vec![Column::new("id", DataType::Int), Column::new("name", DataType::Str)],
            vec![vec![Value::Int(1), Value::from("x")]],
        )
        .unwrap();

        assert_eq!(table.width(), 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(table.column_index("name"), Some(1));
        assert_eq!(table.column_index("missing"), None);
    }
}
