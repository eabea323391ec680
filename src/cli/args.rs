//! CLI argument definitions using clap
//!
//! Commands:
//! - sqleval run <table-folder> <query-file> <output-file>
//! - sqleval explain <table-folder> <query-file>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sqleval - evaluates JSON SQL queries over JSON tables
#[derive(Parser, Debug)]
#[command(name = "sqleval")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to an optional configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a query and write the result table
    Run {
        /// Folder holding the table documents
        table_folder: PathBuf,
        /// Query document
        query_file: PathBuf,
        /// Destination for the result table
        output_file: PathBuf,
    },

    /// Print the plan for a query without evaluating it
    Explain {
        /// Folder holding the table documents
        table_folder: PathBuf,
        /// Query document
        query_file: PathBuf,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["sqleval", "run", "tables", "q.json", "out.json"]).unwrap();
        assert!(cli.config.is_none());
        match cli.command {
            Command::Run { output_file, .. } => assert_eq!(output_file, PathBuf::from("out.json")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sqleval", "explain", "tables", "q.json", "--json", "--config", "c.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
        assert!(matches!(cli.command, Command::Explain { json: true, .. }));
    }

    #[test]
    fn test_missing_arguments() {
        assert!(Cli::try_parse_from(["sqleval", "run", "tables"]).is_err());
    }
}
