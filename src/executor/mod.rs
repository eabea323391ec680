//! Query executor subsystem
//!
//! Consumes plans and produces deterministic result tables.
//!
//! # Execution Flow (strict order)
//!
//! 1. Join sources left to right (hash fast path for column equality)
//! 2. Filter with WHERE
//! 3. Group and apply HAVING
//! 4. Project SELECT values and ORDER BY keys
//! 5. Sort, then OFFSET and LIMIT
//! 6. Assemble the result table
//!
//! # Invariants
//!
//! - Deterministic execution: same inputs, same table
//! - Stages never share mutable state; each materializes a new relation
//! - Any error aborts the whole query, no partial results

mod aggregate;
mod eval;
mod executor;
mod filters;
mod functions;
mod join;
mod projector;
mod result;
mod sorter;

pub use aggregate::{Accumulator, Aggregator, Group};
pub use eval::{evaluate, evaluate_predicate, EvalContext, GroupContext, RowContext};
pub use executor::QueryExecutor;
pub use filters::PredicateFilter;
pub use functions::ScalarFunction;
pub use join::JoinExecutor;
pub use projector::{ProjectedRow, Projector};
pub use result::{ExecutionResult, ExecutionStats};
pub use sorter::ResultSorter;
