//! CLI module for sqleval
//!
//! Provides command-line interface for:
//! - run: Evaluate a query and write the result table
//! - explain: Print the plan for a query

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{explain, run, run_command, run_query};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_query, write_error, write_table};
