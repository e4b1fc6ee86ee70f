//! The spreadsheet persistence boundary.
//!
//! The store never touches the file format directly; it goes through the
//! [`SheetStore`] trait so tests can substitute an in-memory double and the
//! binary format stays an external concern.

pub mod file;
pub mod layout;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Errors crossing the persistence boundary. Only malformed file *structure*
/// surfaces here; malformed row data is reported by ingestion instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    /// The sheet file does not exist.
    NotFound(PathBuf),
    /// The file could not be read or written.
    Io(String),
    /// The file exists but is not a readable sheet.
    Malformed(String),
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::NotFound(path) => write!(f, "sheet file not found: {}", path.display()),
            SheetError::Io(msg) => write!(f, "sheet io error: {msg}"),
            SheetError::Malformed(msg) => write!(f, "malformed sheet: {msg}"),
        }
    }
}

impl std::error::Error for SheetError {}

/// Abstraction over the external spreadsheet file.
pub trait SheetStore {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, SheetError>;

    fn write_rows(&mut self, path: &Path, rows: &[Vec<String>]) -> Result<(), SheetError>;

    /// Last-modified time of the file, if the backend can report one.
    fn modified(&self, _path: &Path) -> Option<SystemTime> {
        None
    }
}

/// In-memory sheet double for tests. Clones share the same underlying map so
/// a test can mutate the "file" behind a store's back.
#[derive(Debug, Default, Clone)]
pub struct MemorySheet {
    sheets: Arc<Mutex<HashMap<PathBuf, Vec<Vec<String>>>>>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plants file contents directly, bypassing the trait.
    pub fn put(&self, path: impl Into<PathBuf>, rows: Vec<Vec<String>>) {
        self.sheets
            .lock()
            .expect("sheet mutex poisoned")
            .insert(path.into(), rows);
    }

    pub fn get(&self, path: &Path) -> Option<Vec<Vec<String>>> {
        self.sheets
            .lock()
            .expect("sheet mutex poisoned")
            .get(path)
            .cloned()
    }

    pub fn remove(&self, path: &Path) {
        self.sheets
            .lock()
            .expect("sheet mutex poisoned")
            .remove(path);
    }
}

impl SheetStore for MemorySheet {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, SheetError> {
        self.sheets
            .lock()
            .expect("sheet mutex poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| SheetError::NotFound(path.to_path_buf()))
    }

    fn write_rows(&mut self, path: &Path, rows: &[Vec<String>]) -> Result<(), SheetError> {
        self.sheets
            .lock()
            .expect("sheet mutex poisoned")
            .insert(path.to_path_buf(), rows.to_vec());
        Ok(())
    }
}
