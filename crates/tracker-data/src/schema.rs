//! Declared column layout of the hub worksheet.
//!
//! Column identity is purely positional. The layout is written down here once
//! as `(source index, field, kind)` triples and checked against each grid's
//! width before any row is read.

use tracker_core::error::{Result, TrackerError};
use tracker_core::models::CellAddress;

/// Rows above this index are preamble decoration.
pub const HEADER_ROW: usize = 5;

/// First data row (zero-based).
pub const FIRST_DATA_ROW: usize = HEADER_ROW + 1;

/// Cell holding the maintainer's last-update note.
pub const LAST_UPDATE_CELL: CellAddress = CellAddress { row: 0, col: 24 };

/// Target field of a sheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    HubName,
    RegionFilter,
    City,
    Rd,
    Rm,
    Dd,
    Dm,
    Crm,
    Cdm,
    GapTotal,
    PicBpom,
    Notes,
}

/// How a column's text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Kept verbatim.
    Text,
    /// Locale-formatted number coerced to an integer.
    Count,
}

/// One declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub source_index: usize,
    pub field: Field,
    pub kind: FieldKind,
}

const fn col(source_index: usize, field: Field, kind: FieldKind) -> ColumnSpec {
    ColumnSpec {
        source_index,
        field,
        kind,
    }
}

/// Identity group. Index 1 is intentionally skipped.
pub const IDENTITY_COLUMNS: [ColumnSpec; 3] = [
    col(0, Field::HubName, FieldKind::Text),
    col(2, Field::RegionFilter, FieldKind::Text),
    col(3, Field::City, FieldKind::Text),
];

/// Metric group, indices 16..=23. The last one is a text label.
pub const METRIC_COLUMNS: [ColumnSpec; 8] = [
    col(16, Field::Rd, FieldKind::Count),
    col(17, Field::Rm, FieldKind::Count),
    col(18, Field::Dd, FieldKind::Count),
    col(19, Field::Dm, FieldKind::Count),
    col(20, Field::Crm, FieldKind::Count),
    col(21, Field::Cdm, FieldKind::Count),
    col(22, Field::GapTotal, FieldKind::Count),
    col(23, Field::PicBpom, FieldKind::Text),
];

pub const NOTES_COLUMN: ColumnSpec = col(24, Field::Notes, FieldKind::Text);

/// Every declared column, in schema order.
pub fn hub_schema() -> impl Iterator<Item = &'static ColumnSpec> {
    IDENTITY_COLUMNS
        .iter()
        .chain(METRIC_COLUMNS.iter())
        .chain(std::iter::once(&NOTES_COLUMN))
}

/// Minimum grid width the schema needs.
pub fn required_width() -> usize {
    hub_schema().map(|c| c.source_index + 1).max().unwrap_or(0)
}

/// Widest row of `grid`.
pub fn grid_width(grid: &[Vec<String>]) -> usize {
    grid.iter().map(Vec::len).max().unwrap_or(0)
}

/// Fail with [`TrackerError::LayoutMismatch`] when no row reaches the last
/// declared column.
pub fn validate_width(grid: &[Vec<String>]) -> Result<()> {
    let required = required_width();
    let found = grid_width(grid);
    if found < required {
        return Err(TrackerError::LayoutMismatch { required, found });
    }
    Ok(())
}
