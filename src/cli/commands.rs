//! CLI command implementations
//!
//! Both commands read the query, then load every table it names before
//! evaluation begins. A missing or malformed input aborts the command;
//! a query that fails against well-formed inputs is reported in the
//! command's normal output.

use std::path::Path;

use crate::executor::QueryExecutor;
use crate::loader::{DirectoryTableLoader, MemoryTableLoader, TableLoader};
use crate::observability::Logger;
use crate::planner::{ExplainPlan, Query};

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::CliResult;
use super::io::{read_query, write_error, write_stdout, write_table};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let config = Config::load_or_default(cli.config.as_deref())?;
    run_command(&config, cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(config: &Config, cmd: Command) -> CliResult<()> {
    Logger::set_min_severity(config.severity()?);

    match cmd {
        Command::Run {
            table_folder,
            query_file,
            output_file,
        } => run_query(config, &table_folder, &query_file, &output_file),
        Command::Explain {
            table_folder,
            query_file,
            json,
        } => explain(config, &table_folder, &query_file, json),
    }
}

/// Evaluate a query and write its result table.
///
/// A query error is written to the output file as `ERROR: <message>` and
/// the command still succeeds.
pub fn run_query(
    config: &Config,
    table_folder: &Path,
    query_file: &Path,
    output_file: &Path,
) -> CliResult<()> {
    let query = read_query(query_file)?;
    let tables = load_tables(config, table_folder, &query)?;
    let executor = QueryExecutor::new(&tables).with_hash_join(config.hash_join);

    match executor.execute(&query) {
        Ok(result) => {
            write_table(output_file, &result.table)?;
            Logger::info(
                "RESULT_WRITTEN",
                &[
                    ("output", &output_file.display().to_string()),
                    ("joined_rows", &result.stats.joined_rows.to_string()),
                    ("filtered_rows", &result.stats.filtered_rows.to_string()),
                    ("groups", &result.stats.groups.to_string()),
                    ("rows", &result.stats.output_rows.to_string()),
                ],
            );
        }
        Err(err) => {
            write_error(output_file, &err)?;
            Logger::warn(
                "QUERY_REJECTED",
                &[
                    ("output", &output_file.display().to_string()),
                    ("code", err.code().code()),
                ],
            );
        }
    }

    Ok(())
}

/// Plan a query and print the plan, or the reason it was rejected
pub fn explain(config: &Config, table_folder: &Path, query_file: &Path, json: bool) -> CliResult<()> {
    let query = read_query(query_file)?;
    let tables = load_tables(config, table_folder, &query)?;
    let executor = QueryExecutor::new(&tables).with_hash_join(config.hash_join);

    let plan = match executor.plan(&query) {
        Ok((plan, _)) => ExplainPlan::from_plan(&plan),
        Err(err) => ExplainPlan::from_error(&err),
    };

    if json {
        write_stdout(&serde_json::to_string_pretty(&plan.to_json())?)
    } else {
        write_stdout(&plan.to_string())
    }
}

/// Reads every table named in FROM, so input failures surface before the
/// query runs
fn load_tables(config: &Config, table_folder: &Path, query: &Query) -> CliResult<MemoryTableLoader> {
    let directory = DirectoryTableLoader::new(table_folder).with_suffix(config.table_suffix.as_str());
    let mut tables = MemoryTableLoader::new();

    for source in &query.from {
        if tables.load(&source.source).is_ok() {
            continue;
        }
        tables.insert(source.source.as_str(), directory.load(&source.source)?);
    }

    Ok(tables)
}
