//! sqleval - evaluates a JSON-encoded SQL subset over JSON tables
//!
//! Queries flow through three layers:
//! - `codec` decodes query and table documents
//! - `planner` resolves names and chooses join strategies
//! - `executor` joins, filters, groups, projects and sorts in memory

pub mod cli;
pub mod codec;
pub mod errors;
pub mod executor;
pub mod loader;
pub mod observability;
pub mod planner;
pub mod schema;
pub mod value;

pub use codec::{decode_query, decode_table, encode_table, DocumentError};
pub use errors::{QueryError, QueryErrorCode, QueryResult};
pub use executor::{ExecutionResult, ExecutionStats, QueryExecutor};
pub use loader::{DirectoryTableLoader, MemoryTableLoader, TableLoader};
pub use planner::{ExplainPlan, Query, QueryPlanner};
pub use schema::{Column, Table};
pub use value::{DataType, Value};
