//! File I/O for CLI commands
//!
//! - Query documents are read whole and decoded
//! - Result tables are written in the array form
//! - A failed query writes `ERROR: <message>` in place of the table

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::codec::{decode_query, encode_table};
use crate::errors::QueryError;
use crate::planner::Query;
use crate::schema::Table;

use super::errors::{CliError, CliResult};

/// Read and decode a query document
pub fn read_query(path: &Path) -> CliResult<Query> {
    let bytes = fs::read(path).map_err(|e| {
        CliError::input_error(format!("Failed to read query {}: {}", path.display(), e))
    })?;
    Ok(decode_query(&bytes)?)
}

/// Write a result table
pub fn write_table(path: &Path, table: &Table) -> CliResult<()> {
    write_file(path, &encode_table(table))
}

/// Write a query failure in place of the result table
pub fn write_error(path: &Path, err: &QueryError) -> CliResult<()> {
    write_file(path, &format!("ERROR: {}\n", err.message()))
}

fn write_file(path: &Path, contents: &str) -> CliResult<()> {
    fs::write(path, contents).map_err(|e| {
        CliError::io_error(format!("Failed to write {}: {}", path.display(), e))
    })
}

/// Write text to stdout
pub fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout();
    writeln!(stdout, "{}", text)?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_write_error_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");

        write_error(&path, &QueryError::unknown_column("x")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ERROR: Unknown column \"x\".\n");
    }

    #[test]
    fn test_read_query_failures_are_input_errors() {
        let dir = TempDir::new().unwrap();
        let missing = read_query(&dir.path().join("q.json")).unwrap_err();
        assert_eq!(missing.code(), &CliErrorCode::InputError);

        let path = dir.path().join("bad.json");
        fs::write(&path, "{\"select\": 1}").unwrap();
        assert_eq!(read_query(&path).unwrap_err().code(), &CliErrorCode::InputError);
    }
}
