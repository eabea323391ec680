//! Schema and table subsystem
//!
//! Provides the in-memory relation exchanged between every stage and the
//! resolution of (optionally qualified) column names to row positions.

mod scope;
mod table;

pub use scope::{Scope, SourceBinding};
pub use table::{Column, Row, Table};
