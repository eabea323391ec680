//! WHERE filtering
//!
//! Keeps rows whose predicate is exactly `Bool(true)`. `false` and Null
//! drop the row; any other result is a type error. Schema and row order
//! are preserved.

use crate::errors::QueryResult;
use crate::planner::BoundExpr;
use crate::schema::Table;
use crate::value::Value;

use super::eval::{evaluate_predicate, RowContext};

/// Evaluates a WHERE predicate against rows
pub struct PredicateFilter;

impl PredicateFilter {
    /// Returns the rows of `table` that satisfy `predicate`
    pub fn apply(table: Table, predicate: &BoundExpr) -> QueryResult<Table> {
        let (columns, rows) = table.into_parts();

        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if Self::matches(&row, predicate)? {
                kept.push(row);
            }
        }

        Ok(Table::from_parts(columns, kept))
    }

    /// Checks if a single row satisfies the predicate
    pub fn matches(row: &[Value], predicate: &BoundExpr) -> QueryResult<bool> {
        evaluate_predicate(predicate, &RowContext::new(row), "WHERE clause")
    }
}
