//! Query planner subsystem
//!
//! Turns a parsed query into a deterministic plan with every name
//! resolved to a row position.
//!
//! # Design Principles
//!
//! - Deterministic: same query and tables, same plan
//! - Fail early: name resolution and query shape errors surface here
//! - Explicit: join strategy and grouping mode are decided once, up front

mod ast;
mod bound;
mod explain;
mod planner;

pub use ast::{
    AggregateFunction, BinaryOperator, Expr, OrderItem, Query, SelectItem, SortDirection, TableRef,
    UnaryOperator,
};
pub use bound::BoundExpr;
pub use explain::ExplainPlan;
pub use planner::{
    AggregationPlan, JoinPlan, JoinStrategy, ProjectionColumn, QueryPlan, QueryPlanner, SortKey,
    SourcePlan,
};
