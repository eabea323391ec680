//! Column resolution across the sources of a query
//!
//! A [`Scope`] lists the FROM sources bound so far, left to right, each
//! with its qualifier (alias, or source name when no alias is given) and
//! the offset of its first column in the joined row. Scopes are immutable:
//! adding a source returns a new scope, so nothing global is ever mutated
//! while a query is planned.

use crate::errors::{QueryError, QueryResult};

use super::table::Table;

/// One source visible in a scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBinding {
    /// Name used to qualify column references
    pub qualifier: String,
    /// Column names of the source, in order
    pub columns: Vec<String>,
    /// Position of the first column in the joined row
    pub offset: usize,
}

impl SourceBinding {
    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Immutable registry of sources in scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    sources: Vec<SourceBinding>,
}

impl Scope {
    /// Creates an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new scope with `table` appended under `qualifier`
    pub fn with_source(&self, qualifier: impl Into<String>, table: &Table) -> Scope {
        let mut sources = self.sources.clone();
        sources.push(SourceBinding {
            qualifier: qualifier.into(),
            columns: table.columns().iter().map(|c| c.name.clone()).collect(),
            offset: self.width(),
        });
        Scope { sources }
    }

    /// Total number of columns across all sources
    pub fn width(&self) -> usize {
        self.sources
            .last()
            .map(|s| s.offset + s.columns.len())
            .unwrap_or(0)
    }

    pub fn sources(&self) -> &[SourceBinding] {
        &self.sources
    }

    /// Number of sources that expose a column called `name`
    pub fn sources_with_column(&self, name: &str) -> usize {
        self.sources
            .iter()
            .filter(|s| s.position(name).is_some())
            .count()
    }

    /// Qualified name (`q.column`) of the column at `index` in the joined row
    pub fn describe(&self, index: usize) -> String {
        self.sources
            .iter()
            .find(|s| index >= s.offset && index < s.offset + s.columns.len())
            .map(|s| format!("{}.{}", s.qualifier, s.columns[index - s.offset]))
            .unwrap_or_else(|| format!("#{}", index))
    }

    /// Resolves a column reference to its position in the joined row.
    ///
    /// Qualified references only look inside the named source (the leftmost
    /// one when a qualifier repeats). Unqualified references must match
    /// exactly one source.
    pub fn resolve(&self, table: Option<&str>, name: &str) -> QueryResult<usize> {
        match table {
            Some(qualifier) => {
                let source = self
                    .sources
                    .iter()
                    .find(|s| s.qualifier == qualifier)
                    .ok_or_else(|| QueryError::unknown_table(qualifier))?;
                source
                    .position(name)
                    .map(|p| source.offset + p)
                    .ok_or_else(|| QueryError::unknown_column_in_table(name, qualifier))
            }
            None => {
                let matches: Vec<(&SourceBinding, usize)> = self
                    .sources
                    .iter()
                    .filter_map(|s| s.position(name).map(|p| (s, p)))
                    .collect();

                match matches.as_slice() {
                    [] => Err(QueryError::unknown_column(name)),
                    [(source, position)] => Ok(source.offset + position),
                    many => {
                        let qualifiers: Vec<&str> =
                            many.iter().map(|(s, _)| s.qualifier.as_str()).collect();
                        Err(QueryError::ambiguous_column(name, &qualifiers))
                    }
                }
            }
        }
    }
}
