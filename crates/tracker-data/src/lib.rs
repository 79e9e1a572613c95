//! Data layer for the hub tracker.
//!
//! Reads worksheets through a [`source::SheetSource`] backend, normalizes the
//! grid into hub records and computes the summary views.

pub mod aggregator;
pub mod csv_source;
pub mod extractor;
pub mod google;
pub mod schema;
pub mod source;

pub use tracker_core as core;

pub use aggregator::{per_city_totals, per_metric_totals, CityTotal, CityTotals, MetricTotal};
pub use extractor::{extract_hub_records, load_snapshot, HubSnapshot, SnapshotStatus};
pub use source::{fetch_sheet, SheetFetch, SheetSource};
