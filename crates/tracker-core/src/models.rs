use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;
use crate::formatting::format_count;

/// Unprocessed cell matrix as read from the sheet, rows × columns.
///
/// Row 0 is sheet row 1. Rows may be ragged; a missing cell reads as `""`.
pub type RawGrid = Vec<Vec<String>>;

/// Value of the cell at `row`/`col`, or `""` when the row is too short.
pub fn cell_text(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

/// One of the six named shortfall counts tracked per hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GapMetric {
    Rd,
    Rm,
    Dd,
    Dm,
    Crm,
    Cdm,
}

impl GapMetric {
    /// All metrics in sheet column order.
    pub const ALL: [GapMetric; 6] = [
        GapMetric::Rd,
        GapMetric::Rm,
        GapMetric::Dd,
        GapMetric::Dm,
        GapMetric::Crm,
        GapMetric::Cdm,
    ];

    /// Upper-case display label, e.g. `"CRM"`.
    pub fn label(self) -> &'static str {
        match self {
            GapMetric::Rd => "RD",
            GapMetric::Rm => "RM",
            GapMetric::Dd => "DD",
            GapMetric::Dm => "DM",
            GapMetric::Crm => "CRM",
            GapMetric::Cdm => "CDM",
        }
    }
}

impl fmt::Display for GapMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single hub location after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubRecord {
    pub hub_name: String,
    pub city: String,
    pub rd: i64,
    pub rm: i64,
    pub dd: i64,
    pub dm: i64,
    pub crm: i64,
    pub cdm: i64,
    /// Read from its own sheet column; not required to equal the metric sum.
    pub gap_total: i64,
    /// Responsible-party label. Sits among the metric columns but is text.
    pub pic_bpom: String,
    pub notes: String,
}

/// Header labels for the hub table, in fixed display order.
pub const DISPLAY_COLUMNS: [&str; 11] = [
    "Nama Hub", "Kab/Kota", "RD", "RM", "DD", "DM", "CRM", "CDM", "GAP TOTAL", "PIC BPOM",
    "NOTES",
];

impl HubRecord {
    /// Value of one gap metric.
    pub fn metric(&self, metric: GapMetric) -> i64 {
        match metric {
            GapMetric::Rd => self.rd,
            GapMetric::Rm => self.rm,
            GapMetric::Dd => self.dd,
            GapMetric::Dm => self.dm,
            GapMetric::Crm => self.crm,
            GapMetric::Cdm => self.cdm,
        }
    }

    /// Sum of the six component metrics. Informational only: `gap_total`
    /// is never replaced by it.
    pub fn component_sum(&self) -> i64 {
        GapMetric::ALL
            .iter()
            .map(|m| self.metric(*m))
            .fold(0i64, i64::saturating_add)
    }

    /// Cell texts in [`DISPLAY_COLUMNS`] order, counts thousands-grouped.
    pub fn display_cells(&self) -> [String; 11] {
        [
            self.hub_name.clone(),
            self.city.clone(),
            format_count(self.rd),
            format_count(self.rm),
            format_count(self.dd),
            format_count(self.dm),
            format_count(self.crm),
            format_count(self.cdm),
            format_count(self.gap_total),
            self.pic_bpom.clone(),
            self.notes.clone(),
        ]
    }
}

/// The sheet maintainer's self-reported update marker (cell `Y1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum LastUpdate {
    /// The cell held a value; passed through unmodified.
    Value(String),
    /// The fetch succeeded but the cell was empty.
    Empty,
    /// The fetch failed; no marker is known.
    FetchFailed,
}

impl LastUpdate {
    /// Display text of the failure sentinel.
    pub const FETCH_FAILED_TEXT: &'static str = "fetch-failed";

    /// Wrap a raw cell read.
    pub fn from_cell(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.is_empty() => LastUpdate::Value(v),
            _ => LastUpdate::Empty,
        }
    }

    /// The marker text when a real value is present.
    pub fn as_value(&self) -> Option<&str> {
        match self {
            LastUpdate::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_fetch_failed(&self) -> bool {
        matches!(self, LastUpdate::FetchFailed)
    }
}

impl fmt::Display for LastUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastUpdate::Value(v) => f.write_str(v),
            LastUpdate::Empty => Ok(()),
            LastUpdate::FetchFailed => f.write_str(Self::FETCH_FAILED_TEXT),
        }
    }
}

/// How a worksheet inside a spreadsheet is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorksheetId {
    /// Numeric sheet id (the `gid=` URL parameter).
    Gid(u64),
    /// Tab title as shown in the sheet UI.
    Title(String),
}

impl fmt::Display for WorksheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorksheetId::Gid(gid) => write!(f, "gid={gid}"),
            WorksheetId::Title(title) => write!(f, "{title:?}"),
        }
    }
}

/// Identifies one worksheet of one spreadsheet; also the fetch cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetRef {
    pub spreadsheet_id: String,
    pub worksheet: WorksheetId,
}

impl SheetRef {
    pub fn new(spreadsheet_id: impl Into<String>, worksheet: WorksheetId) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            worksheet,
        }
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.spreadsheet_id, self.worksheet)
    }
}

/// A zero-based cell position parsed from A1 notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    pub row: usize,
    pub col: usize,
}

impl CellAddress {
    /// Render back to A1 notation.
    pub fn to_a1(self) -> String {
        let mut letters = Vec::new();
        let mut n = self.col + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(b'A' + rem as u8);
            n = (n - 1) / 26;
        }
        letters.reverse();
        format!("{}{}", String::from_utf8_lossy(&letters), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = TrackerError;

    /// Parse `"Y1"`-style addresses (case-insensitive column letters).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| TrackerError::Config(format!("invalid cell address: {s:?}")))?;
        let (letters, digits) = s.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(TrackerError::Config(format!("invalid cell address: {s:?}")));
        }

        let col = letters
            .chars()
            .try_fold(0usize, |acc, c| {
                acc.checked_mul(26)?
                    .checked_add(c.to_ascii_uppercase() as usize - 'A' as usize + 1)
            })
            .ok_or_else(|| TrackerError::Config(format!("cell column out of range: {s:?}")))?
            - 1;

        let row: usize = digits
            .parse()
            .map_err(|_| TrackerError::Config(format!("invalid cell address: {s:?}")))?;
        if row == 0 {
            return Err(TrackerError::Config(format!("invalid cell address: {s:?}")));
        }

        Ok(CellAddress { row: row - 1, col })
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}
