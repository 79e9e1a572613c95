//! Sheet access abstraction.
//!
//! The tracker reads exactly two things from a worksheet: one cell (the
//! update marker) and the full cell matrix. Backends implement
//! [`SheetSource`]; [`fetch_sheet`] performs both reads for one pass.

use async_trait::async_trait;
use tracing::debug;

use tracker_core::error::Result;
use tracker_core::models::{CellAddress, RawGrid, SheetRef};

use crate::schema::LAST_UPDATE_CELL;

/// Read access to one spreadsheet backend.
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Every populated cell of the worksheet as rows of strings.
    async fn fetch_all_values(&self, sheet: &SheetRef) -> Result<RawGrid>;

    /// Value of a single cell; `None` when the cell is empty or absent.
    async fn fetch_cell(&self, sheet: &SheetRef, cell: CellAddress) -> Result<Option<String>>;

    /// Short backend name for log fields.
    fn name(&self) -> &'static str;
}

/// Raw result of one fetch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetFetch {
    pub grid: RawGrid,
    pub last_update: Option<String>,
}

/// Read the update marker, then the full grid. Either failure fails the pass.
pub async fn fetch_sheet<S: SheetSource + ?Sized>(source: &S, sheet: &SheetRef) -> Result<SheetFetch> {
    let last_update = source.fetch_cell(sheet, LAST_UPDATE_CELL).await?;
    let grid = source.fetch_all_values(sheet).await?;

    debug!(
        source = source.name(),
        sheet = %sheet,
        rows = grid.len(),
        has_marker = last_update.is_some(),
        "sheet fetched"
    );

    Ok(SheetFetch { grid, last_update })
}
