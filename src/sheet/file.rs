//! CSV-backed sheet adapter for local files.

use std::path::Path;
use std::time::SystemTime;

use csv::{ReaderBuilder, WriterBuilder};

use super::{SheetError, SheetStore};

/// Adapter persisting sheet data as a local CSV file.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvSheet;

impl CsvSheet {
    pub fn new() -> Self {
        Self
    }
}

impl SheetStore for CsvSheet {
    fn read_rows(&self, path: &Path) -> Result<Vec<Vec<String>>, SheetError> {
        if !path.exists() {
            return Err(SheetError::NotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path).map_err(|e| SheetError::Io(e.to_string()))?;
        // Rows can be ragged when optional trailing columns are omitted.
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);
        let mut rows = Vec::new();
        for record in rdr.records() {
            let rec = record.map_err(|e| SheetError::Malformed(e.to_string()))?;
            rows.push(rec.iter().map(|s| s.to_string()).collect());
        }
        Ok(rows)
    }

    fn write_rows(&mut self, path: &Path, rows: &[Vec<String>]) -> Result<(), SheetError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| SheetError::Io(e.to_string()))?;
            }
        }
        let file = std::fs::File::create(path).map_err(|e| SheetError::Io(e.to_string()))?;
        let mut wtr = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);
        for row in rows {
            wtr.write_record(row)
                .map_err(|e| SheetError::Io(e.to_string()))?;
        }
        wtr.flush().map_err(|e| SheetError::Io(e.to_string()))
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}
