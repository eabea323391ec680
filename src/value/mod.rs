//! Value model
//!
//! Typed scalar values plus the comparison, arithmetic and null rules every
//! other subsystem relies on.

mod ops;
mod types;

pub use ops::{kleene_and, kleene_or, Arithmetic, Comparison, LikePattern};
pub use types::{DataType, GroupKey, Value};
