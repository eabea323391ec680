//! Result types for query execution

use crate::schema::Table;

/// Row counts observed at each stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Rows after all joins
    pub joined_rows: usize,
    /// Rows after WHERE
    pub filtered_rows: usize,
    /// Groups after HAVING (0 for non-aggregate queries)
    pub groups: usize,
    /// Rows in the result
    pub output_rows: usize,
}

/// Result of query execution
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Result table in output order
    pub table: Table,
    pub stats: ExecutionStats,
}

impl ExecutionResult {
    /// Returns true if no rows were produced
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of result rows
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Consumes the result, returning the table
    pub fn into_table(self) -> Table {
        self.table
    }
}
