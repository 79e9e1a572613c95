//! Summary views over the hub table.
//!
//! Both views are recomputed from scratch on every snapshot; nothing is
//! carried between refreshes.

use std::collections::BTreeMap;

use tracker_core::formatting::format_count;
use tracker_core::models::{GapMetric, HubRecord};

/// Headroom applied above the largest bar so it does not touch the frame.
pub const AXIS_HEADROOM: f64 = 1.10;

// ── Per-city totals ───────────────────────────────────────────────────────────

/// Summed `GAP TOTAL` of one city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityTotal {
    pub city: String,
    pub total: i64,
}

impl CityTotal {
    /// Bar label text.
    pub fn label(&self) -> String {
        format_count(self.total)
    }
}

/// City totals, largest first, plus axis scaling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityTotals {
    pub entries: Vec<CityTotal>,
    /// Largest total; `None` for an empty table.
    pub max_total: Option<i64>,
    /// `max_total` with [`AXIS_HEADROOM`] applied.
    pub axis_upper_bound: Option<f64>,
}

impl CityTotals {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Group `records` by city and sum `gap_total`.
///
/// Ordered by total descending, ties by city name ascending. The empty city
/// string is a group of its own. Sums saturate at the `i64` bounds.
pub fn per_city_totals(records: &[HubRecord]) -> CityTotals {
    let mut sums: BTreeMap<&str, i64> = BTreeMap::new();
    for record in records {
        let sum = sums.entry(record.city.as_str()).or_insert(0);
        *sum = sum.saturating_add(record.gap_total);
    }

    let mut entries: Vec<CityTotal> = sums
        .into_iter()
        .map(|(city, total)| CityTotal {
            city: city.to_string(),
            total,
        })
        .collect();
    entries.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.city.cmp(&b.city)));

    let max_total = entries.first().map(|e| e.total);
    CityTotals {
        entries,
        max_total,
        axis_upper_bound: max_total.map(|m| m as f64 * AXIS_HEADROOM),
    }
}

// ── Per-metric totals ─────────────────────────────────────────────────────────

/// Sum of one shortfall metric across all hubs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricTotal {
    pub metric: GapMetric,
    pub total: i64,
}

impl MetricTotal {
    pub fn label(&self) -> String {
        format_count(self.total)
    }
}

/// Column sums of the six named metrics, largest first, ties by metric
/// label ascending. Empty for an empty table.
pub fn per_metric_totals(records: &[HubRecord]) -> Vec<MetricTotal> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut totals: Vec<MetricTotal> = GapMetric::ALL
        .iter()
        .map(|&metric| MetricTotal {
            metric,
            total: records
                .iter()
                .map(|r| r.metric(metric))
                .fold(0i64, i64::saturating_add),
        })
        .collect();
    totals.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.metric.label().cmp(b.metric.label()))
    });
    totals
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hub: &str, city: &str, counts: [i64; 6], gap_total: i64) -> HubRecord {
        HubRecord {
            hub_name: hub.to_string(),
            city: city.to_string(),
            rd: counts[0],
            rm: counts[1],
            dd: counts[2],
            dm: counts[3],
            crm: counts[4],
            cdm: counts[5],
            gap_total,
            pic_bpom: String::new(),
            notes: String::new(),
        }
    }

    // ── per_city_totals ───────────────────────────────────────────────────

    #[test]
    fn test_city_totals_grouped_and_sorted() {
        let records = vec![
            record("A", "X", [0; 6], 4),
            record("B", "Y", [0; 6], 10),
            record("C", "X", [0; 6], 3),
        ];
        let totals = per_city_totals(&records);
        assert_eq!(
            totals.entries,
            vec![
                CityTotal { city: "Y".to_string(), total: 10 },
                CityTotal { city: "X".to_string(), total: 7 },
            ]
        );
        assert_eq!(totals.max_total, Some(10));
        let bound = totals.axis_upper_bound.unwrap();
        assert!((bound - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_city_totals_empty_table() {
        let totals = per_city_totals(&[]);
        assert!(totals.is_empty());
        assert_eq!(totals.max_total, None);
        assert_eq!(totals.axis_upper_bound, None);
    }

    #[test]
    fn test_city_totals_tie_breaks_by_name() {
        let records = vec![
            record("A", "Metro", [0; 6], 5),
            record("B", "Bandar Lampung", [0; 6], 5),
        ];
        let cities: Vec<String> = per_city_totals(&records)
            .entries
            .into_iter()
            .map(|e| e.city)
            .collect();
        assert_eq!(cities, vec!["Bandar Lampung", "Metro"]);
    }

    #[test]
    fn test_city_totals_empty_city_is_a_group() {
        let records = vec![record("A", "", [0; 6], 2), record("B", "", [0; 6], 1)];
        let totals = per_city_totals(&records);
        assert_eq!(totals.entries.len(), 1);
        assert_eq!(totals.entries[0].city, "");
        assert_eq!(totals.entries[0].total, 3);
    }

    #[test]
    fn test_city_totals_use_trusted_gap_total() {
        // gap_total disagrees with the component sum; the sheet value wins.
        let records = vec![record("A", "X", [1; 6], 99)];
        assert_eq!(per_city_totals(&records).max_total, Some(99));
    }

    #[test]
    fn test_city_label_grouped() {
        let total = CityTotal { city: "X".to_string(), total: 12_345 };
        assert_eq!(total.label(), "12,345");
    }

    // ── per_metric_totals ─────────────────────────────────────────────────

    #[test]
    fn test_metric_totals_sorted_desc() {
        let records = vec![
            record("A", "X", [1, 0, 5, 2, 0, 0], 8),
            record("B", "Y", [2, 0, 0, 0, 0, 0], 2),
        ];
        let totals = per_metric_totals(&records);
        assert_eq!(totals.len(), 6);
        assert_eq!(totals[0], MetricTotal { metric: GapMetric::Dd, total: 5 });
        assert_eq!(totals[1], MetricTotal { metric: GapMetric::Rd, total: 3 });
        assert_eq!(totals[2], MetricTotal { metric: GapMetric::Dm, total: 2 });
        // Remaining zeros ordered by label.
        let rest: Vec<&str> = totals[3..].iter().map(|t| t.metric.label()).collect();
        assert_eq!(rest, vec!["CDM", "CRM", "RM"]);
    }

    #[test]
    fn test_metric_totals_all_zero_still_six_bars() {
        let records = vec![record("A", "X", [0; 6], 0)];
        let totals = per_metric_totals(&records);
        assert_eq!(totals.len(), 6);
        assert!(totals.iter().all(|t| t.total == 0));
    }

    #[test]
    fn test_metric_totals_empty_table() {
        assert!(per_metric_totals(&[]).is_empty());
    }

    // ── saturation ────────────────────────────────────────────────────────

    #[test]
    fn test_saturated_counts_do_not_overflow() {
        use crate::extractor::extract_hub_records;
        use crate::extractor::tests::{data_row, grid_with};

        let huge = ["1e19", "0", "0", "0", "0", "0", "1e19"];
        let grid = grid_with(vec![
            data_row("A", "Lampung", "Metro", huge, "", ""),
            data_row("B", "Lampung", "Metro", huge, "", ""),
        ]);
        let records = extract_hub_records(&grid, "LAMPUNG").unwrap();
        assert_eq!(records[0].gap_total, i64::MAX);

        let cities = per_city_totals(&records);
        assert_eq!(cities.entries.len(), 1);
        assert_eq!(cities.max_total, Some(i64::MAX));

        let metrics = per_metric_totals(&records);
        assert_eq!(metrics[0], MetricTotal { metric: GapMetric::Rd, total: i64::MAX });
    }

    #[test]
    fn test_negative_totals_saturate_at_min() {
        let records = vec![
            record("A", "X", [i64::MIN, 0, 0, 0, 0, 0], i64::MIN),
            record("B", "X", [-1, 0, 0, 0, 0, 0], -1),
        ];
        assert_eq!(per_city_totals(&records).max_total, Some(i64::MIN));
        let metrics = per_metric_totals(&records);
        let rd = metrics.iter().find(|t| t.metric == GapMetric::Rd).unwrap();
        assert_eq!(rd.total, i64::MIN);
    }
}
