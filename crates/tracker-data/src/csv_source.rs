//! Offline backend reading a CSV export of the worksheet.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use tracker_core::error::{Result, TrackerError};
use tracker_core::models::{cell_text, CellAddress, RawGrid, SheetRef};

use crate::source::SheetSource;

/// Serves every [`SheetRef`] from one CSV file ("File > Download > CSV").
///
/// The file is re-read on every call so edits show up on the next refresh.
/// Fully blank lines are skipped by the reader; sheet exports write empty
/// rows as runs of commas, which are kept.
#[derive(Debug, Clone)]
pub struct CsvGridSource {
    path: PathBuf,
}

impl CsvGridSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_grid(&self) -> Result<RawGrid> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.map_error(e))?;

        let mut grid = RawGrid::new();
        for record in reader.records() {
            let record = record.map_err(|e| self.map_error(e))?;
            grid.push(record.iter().map(str::to_string).collect());
        }
        debug!(path = %self.path.display(), rows = grid.len(), "csv grid read");
        Ok(grid)
    }

    fn map_error(&self, err: csv::Error) -> TrackerError {
        let reason = format!("{}: {err}", self.path.display());
        match err.kind() {
            csv::ErrorKind::Io(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                TrackerError::AuthAccess(reason)
            }
            _ => TrackerError::GenericFetch(reason),
        }
    }
}

#[async_trait]
impl SheetSource for CsvGridSource {
    async fn fetch_all_values(&self, _sheet: &SheetRef) -> Result<RawGrid> {
        self.read_grid()
    }

    async fn fetch_cell(&self, _sheet: &SheetRef, cell: CellAddress) -> Result<Option<String>> {
        let grid = self.read_grid()?;
        let text = grid
            .get(cell.row)
            .map(|row| cell_text(row, cell.col))
            .unwrap_or("");
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}
