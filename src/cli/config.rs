//! Configuration file
//!
//! Optional JSON file passed with `--config`. Every field has a default,
//! so an empty object is a valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::loader::DEFAULT_TABLE_SUFFIX;
use crate::observability::Severity;

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Suffix appended to a table name to find its document
    #[serde(default = "default_table_suffix")]
    pub table_suffix: String,

    /// Minimum log severity (trace, info, warn, error, fatal)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Use the hash join for equality joins
    #[serde(default = "default_hash_join")]
    pub hash_join: bool,
}

fn default_table_suffix() -> String {
    DEFAULT_TABLE_SUFFIX.to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_hash_join() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_suffix: default_table_suffix(),
            log_level: default_log_level(),
            hash_join: default_hash_join(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Loads the file if one was given, else the defaults
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> CliResult<()> {
        if self.table_suffix.is_empty() {
            return Err(CliError::config_error("table_suffix must not be empty"));
        }
        if self.table_suffix.contains('/') || self.table_suffix.contains('\\') {
            return Err(CliError::config_error(format!(
                "Invalid table_suffix: '{}'. Path separators are not allowed.",
                self.table_suffix
            )));
        }

        self.severity()?;
        Ok(())
    }

    /// Parsed log level
    pub fn severity(&self) -> CliResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            CliError::config_error(format!(
                "Invalid log_level: '{}'. Expected trace, info, warn, error or fatal.",
                self.log_level
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, config: serde_json::Value) -> std::path::PathBuf {
        let path = dir.path().join("sqleval.json");
        fs::write(&path, config.to_string()).unwrap();
        path
    }

    #[test]
    fn test_config_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&write_config(&dir, json!({}))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.table_suffix, ".table.json");
        assert_eq!(config.severity().unwrap(), Severity::Info);
        assert!(config.hash_join);
    }

    #[test]
    fn test_config_overrides() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            json!({"table_suffix": ".json", "log_level": "trace", "hash_join": false}),
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.table_suffix, ".json");
        assert_eq!(config.severity().unwrap(), Severity::Trace);
        assert!(!config.hash_join);
    }

    #[test]
    fn test_config_validation() {
        let dir = TempDir::new().unwrap();
        for bad in [
            json!({"table_suffix": ""}),
            json!({"log_level": "loud"}),
            json!({"hash_join": "yes"}),
            json!({"data_dir": "/tmp"}),
        ] {
            let err = Config::load(&write_config(&dir, bad)).unwrap_err();
            assert_eq!(err.code(), &CliErrorCode::ConfigError);
        }
    }

    #[test]
    fn test_missing_config_file() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(&dir.path().join("absent.json")).is_err());
        assert_eq!(Config::load_or_default(None).unwrap(), Config::default());
    }
}
