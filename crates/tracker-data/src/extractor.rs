//! Grid extraction and normalization.
//!
//! Turns the raw worksheet grid into [`HubRecord`]s for one region. Each
//! reshaping step is a pure function over borrowed rows; [`HubSnapshot`]
//! folds the outcome (records, update marker, status) into one value the
//! presentation layer can always render.

use tracing::{debug, warn};

use tracker_core::error::{Result, TrackerError};
use tracker_core::models::{cell_text, HubRecord, LastUpdate, RawGrid, SheetRef};

use crate::schema::{
    self, ColumnSpec, Field, FIRST_DATA_ROW, IDENTITY_COLUMNS, METRIC_COLUMNS, NOTES_COLUMN,
};
use crate::source::{fetch_sheet, SheetFetch, SheetSource};

// ── Intermediate row groups ───────────────────────────────────────────────────

/// Identity columns of one data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityCells {
    pub hub_name: String,
    pub region_filter: String,
    pub city: String,
}

/// Metric columns of one data row, still as sheet text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricCells {
    pub rd: String,
    pub rm: String,
    pub dd: String,
    pub dm: String,
    pub crm: String,
    pub cdm: String,
    pub gap_total: String,
    pub pic_bpom: String,
}

impl MetricCells {
    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Rd => self.rd = value,
            Field::Rm => self.rm = value,
            Field::Dd => self.dd = value,
            Field::Dm => self.dm = value,
            Field::Crm => self.crm = value,
            Field::Cdm => self.cdm = value,
            Field::GapTotal => self.gap_total = value,
            Field::PicBpom => self.pic_bpom = value,
            _ => {}
        }
    }
}

// ── Pure extraction steps ─────────────────────────────────────────────────────

fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}

fn read(row: &[String], column: &ColumnSpec) -> String {
    cell_text(row, column.source_index).to_string()
}

/// Rows below the header, minus rows whose every cell is blank.
pub fn data_rows(grid: &RawGrid) -> Vec<&[String]> {
    grid.iter()
        .skip(FIRST_DATA_ROW)
        .filter(|row| !row.iter().all(|c| is_blank(c)))
        .map(Vec::as_slice)
        .collect()
}

/// Hub name, region filter and city of every row.
pub fn extract_identity(rows: &[&[String]]) -> Vec<IdentityCells> {
    rows.iter()
        .map(|row| {
            let mut cells = IdentityCells::default();
            for column in &IDENTITY_COLUMNS {
                let value = read(row, column);
                match column.field {
                    Field::HubName => cells.hub_name = value,
                    Field::RegionFilter => cells.region_filter = value,
                    Field::City => cells.city = value,
                    _ => {}
                }
            }
            cells
        })
        .collect()
}

/// The eight metric-group cells of every row.
pub fn extract_metrics(rows: &[&[String]]) -> Vec<MetricCells> {
    rows.iter()
        .map(|row| {
            let mut cells = MetricCells::default();
            for column in &METRIC_COLUMNS {
                cells.set(column.field, read(row, column));
            }
            cells
        })
        .collect()
}

/// The free-text notes cell of every row.
pub fn extract_notes(rows: &[&[String]]) -> Vec<String> {
    rows.iter().map(|row| read(row, &NOTES_COLUMN)).collect()
}

/// Coerce locale-formatted sheet text to an integer count.
///
/// `,` is the decimal separator. Anything that does not parse as a finite
/// number becomes 0; fractions are truncated toward zero.
///
/// ```
/// use tracker_data::extractor::parse_count;
///
/// assert_eq!(parse_count("12,5"), 12);
/// assert_eq!(parse_count("n/a"), 0);
/// assert_eq!(parse_count(""), 0);
/// ```
pub fn parse_count(text: &str) -> i64 {
    let normalized = text.replace(',', ".");
    match normalized.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc() as i64,
        _ => 0,
    }
}

/// Join the three column groups by row position, keep rows of `region`
/// (compared against the upper-cased region cell) with a hub name, and
/// coerce the count columns.
pub fn zip_and_filter(
    identity: Vec<IdentityCells>,
    metrics: Vec<MetricCells>,
    notes: Vec<String>,
    region: &str,
) -> Vec<HubRecord> {
    identity
        .into_iter()
        .zip(metrics)
        .zip(notes)
        .filter(|((id, _), _)| id.region_filter.to_uppercase() == region)
        .filter(|((id, _), _)| !is_blank(&id.hub_name))
        .map(|((id, m), notes)| HubRecord {
            hub_name: id.hub_name,
            city: id.city,
            rd: parse_count(&m.rd),
            rm: parse_count(&m.rm),
            dd: parse_count(&m.dd),
            dm: parse_count(&m.dm),
            crm: parse_count(&m.crm),
            cdm: parse_count(&m.cdm),
            gap_total: parse_count(&m.gap_total),
            pic_bpom: m.pic_bpom,
            notes,
        })
        .collect()
}

/// Normalize a fetched grid into the hub table for `region`.
///
/// `region` is expected upper-case. Fails with
/// [`TrackerError::InsufficientData`] for grids of six rows or fewer and
/// [`TrackerError::LayoutMismatch`] for grids narrower than the schema.
pub fn extract_hub_records(grid: &RawGrid, region: &str) -> Result<Vec<HubRecord>> {
    if grid.len() <= FIRST_DATA_ROW {
        return Err(TrackerError::InsufficientData { rows: grid.len() });
    }
    schema::validate_width(grid)?;

    let rows = data_rows(grid);
    let records = zip_and_filter(
        extract_identity(&rows),
        extract_metrics(&rows),
        extract_notes(&rows),
        region,
    );

    let total_mismatches = records
        .iter()
        .filter(|r| r.component_sum() != r.gap_total)
        .count();
    debug!(
        grid_rows = grid.len(),
        data_rows = rows.len(),
        kept = records.len(),
        total_mismatches,
        region,
        "hub records extracted"
    );

    Ok(records)
}

// ── HubSnapshot ───────────────────────────────────────────────────────────────

/// Outcome of one fetch-normalize pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotStatus {
    /// Records are available.
    Ready,
    /// The sheet was read but no row matched the region. Not an error; the
    /// UI shows an explicit "no data" state.
    NoMatchingRows,
    /// Fetch or shape failure; the table is empty.
    Failed(TrackerError),
}

/// Normalized table plus the update marker, as handed to presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSnapshot {
    pub records: Vec<HubRecord>,
    pub last_update: LastUpdate,
    pub status: SnapshotStatus,
}

impl HubSnapshot {
    /// Normalize a fetched grid. Shape errors keep the fetched marker.
    pub fn from_grid(grid: &RawGrid, last_update: LastUpdate, region: &str) -> Self {
        match extract_hub_records(grid, region) {
            Ok(records) if records.is_empty() => Self {
                records,
                last_update,
                status: SnapshotStatus::NoMatchingRows,
            },
            Ok(records) => Self {
                records,
                last_update,
                status: SnapshotStatus::Ready,
            },
            Err(e) => {
                warn!(error = %e, "sheet data unusable");
                Self {
                    records: Vec::new(),
                    last_update,
                    status: SnapshotStatus::Failed(e),
                }
            }
        }
    }

    /// Empty snapshot for a failed fetch, carrying the failure sentinel.
    pub fn fetch_failed(error: TrackerError) -> Self {
        warn!(error = %error, "sheet fetch failed");
        Self {
            records: Vec::new(),
            last_update: LastUpdate::FetchFailed,
            status: SnapshotStatus::Failed(error),
        }
    }

    /// Build from the result of a sheet read.
    pub fn from_fetch(fetch: Result<SheetFetch>, region: &str) -> Self {
        match fetch {
            Ok(f) => Self::from_grid(&f.grid, LastUpdate::from_cell(f.last_update), region),
            Err(e) => Self::fetch_failed(e),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The failure behind an empty table, if any.
    pub fn error(&self) -> Option<&TrackerError> {
        match &self.status {
            SnapshotStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Read `sheet` from `source` and normalize it for `region`.
///
/// Never fails: every error ends up in the snapshot's status.
pub async fn load_snapshot<S: SheetSource + ?Sized>(
    source: &S,
    sheet: &SheetRef,
    region: &str,
) -> HubSnapshot {
    HubSnapshot::from_fetch(fetch_sheet(source, sheet).await, region)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
