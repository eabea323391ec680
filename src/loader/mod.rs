//! Table loaders
//!
//! The executor asks a [`TableLoader`] for each table named in FROM before
//! evaluation begins. Tables are read from a directory of table documents
//! or served from memory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::codec::{decode_table, DocumentError, DocumentResult};
use crate::schema::Table;

/// Default file suffix for table documents
pub const DEFAULT_TABLE_SUFFIX: &str = ".table.json";

/// Source of tables by name
pub trait TableLoader {
    /// Loads the named table
    fn load(&self, name: &str) -> DocumentResult<Table>;
}

/// Loads `<folder>/<name><suffix>` table documents
#[derive(Debug, Clone)]
pub struct DirectoryTableLoader {
    folder: PathBuf,
    suffix: String,
}

impl DirectoryTableLoader {
    pub fn new(folder: impl AsRef<Path>) -> Self {
        Self {
            folder: folder.as_ref().to_path_buf(),
            suffix: DEFAULT_TABLE_SUFFIX.to_string(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Path of the document for `name`, or `None` if the name would escape
    /// the folder
    pub fn table_path(&self, name: &str) -> Option<PathBuf> {
        let unsafe_name = name.is_empty()
            || name.contains("..")
            || name.contains('/')
            || name.contains('\\')
            || name.contains(std::path::MAIN_SEPARATOR);
        if unsafe_name {
            return None;
        }
        Some(self.folder.join(format!("{}{}", name, self.suffix)))
    }
}

impl TableLoader for DirectoryTableLoader {
    fn load(&self, name: &str) -> DocumentResult<Table> {
        let path = self
            .table_path(name)
            .ok_or_else(|| DocumentError::NotFound(name.to_string()))?;

        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DocumentError::NotFound(name.to_string()),
            _ => DocumentError::Io(format!("{}: {}", path.display(), e)),
        })?;

        decode_table(&bytes)
    }
}

/// In-memory tables keyed by name
#[derive(Debug, Clone, Default)]
pub struct MemoryTableLoader {
    tables: HashMap<String, Table>,
}

impl MemoryTableLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a table
    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), table);
    }
}

impl TableLoader for MemoryTableLoader {
    fn load(&self, name: &str) -> DocumentResult<Table> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(name.to_string()))
    }
}
