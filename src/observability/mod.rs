//! Observability subsystem
//!
//! Structured JSON logging and begin/complete scopes.
//!
//! # Principles
//!
//! 1. Observability is read-only: it never changes query results
//! 2. No async or background threads
//! 3. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use sqleval::observability::{Logger, ObservationScope};
//!
//! Logger::info("TABLE_LOADED", &[("table", "orders"), ("rows", "3")]);
//!
//! let scope = ObservationScope::new("QUERY");
//! // ... evaluate ...
//! scope.complete();
//! ```

mod logger;
mod scope;

pub use logger::{Logger, Severity};
pub use scope::{ObservationScope, Timer};
