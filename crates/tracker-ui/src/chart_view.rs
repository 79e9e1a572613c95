//! "Global View" bar charts: gap total per city and per metric.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders},
    Frame,
};

use tracker_data::aggregator::{CityTotals, MetricTotal};

use crate::themes::Theme;

pub const CITY_CHART_TITLE: &str = "Total GAP Berdasarkan Kab/Kota";
pub const METRIC_CHART_TITLE: &str = "Komposisi Total GAP Berdasarkan Posisi";

/// Bars cannot go below the axis.
fn bar_value(total: i64) -> u64 {
    total.max(0) as u64
}

/// Upper end of the city chart's value axis.
pub fn city_axis_max(totals: &CityTotals) -> u64 {
    totals
        .axis_upper_bound
        .map(|b| b.ceil().max(1.0) as u64)
        .unwrap_or(1)
}

/// One bar per city, largest first, labelled with the grouped total.
pub fn city_bars<'a>(totals: &'a CityTotals, theme: &Theme) -> Vec<Bar<'a>> {
    totals
        .entries
        .iter()
        .map(|e| {
            Bar::default()
                .value(bar_value(e.total))
                .text_value(e.label())
                .label(Line::from(e.city.as_str()))
                .style(theme.bar_city)
                .value_style(theme.bar_value)
        })
        .collect()
}

/// One bar per metric, in the given (descending) order.
pub fn metric_bars(totals: &[MetricTotal], theme: &Theme) -> Vec<Bar<'static>> {
    totals
        .iter()
        .map(|t| {
            Bar::default()
                .value(bar_value(t.total))
                .text_value(t.label())
                .label(Line::from(t.metric.label()))
                .style(theme.bar_metric)
                .value_style(theme.bar_value)
        })
        .collect()
}

fn chart_block(title: &str, theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme.table_border)
        .title(format!(" {title} "))
}

/// Horizontal bar chart so long city names stay readable.
pub fn render_city_chart(frame: &mut Frame, area: Rect, totals: &CityTotals, theme: &Theme) {
    let bars = city_bars(totals, theme);
    let chart = BarChart::default()
        .block(chart_block(CITY_CHART_TITLE, theme))
        .direction(Direction::Horizontal)
        .data(BarGroup::default().bars(&bars))
        .bar_width(1)
        .bar_gap(0)
        .max(city_axis_max(totals))
        .label_style(theme.bar_label);
    frame.render_widget(chart, area);
}

pub fn render_metric_chart(frame: &mut Frame, area: Rect, totals: &[MetricTotal], theme: &Theme) {
    let bars = metric_bars(totals, theme);
    let chart = BarChart::default()
        .block(chart_block(METRIC_CHART_TITLE, theme))
        .data(BarGroup::default().bars(&bars))
        .bar_width(7)
        .bar_gap(2)
        .label_style(theme.bar_label);
    frame.render_widget(chart, area);
}

/// Both charts stacked: cities on top, metrics below.
pub fn render_global_view(
    frame: &mut Frame,
    area: Rect,
    city_totals: &CityTotals,
    metric_totals: &[MetricTotal],
    theme: &Theme,
) {
    // Horizontal city bars need one line per city plus the frame.
    let city_height = (city_totals.entries.len() as u16).saturating_add(2);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Max(city_height.max(5)), Constraint::Min(8)])
        .split(area);

    render_city_chart(frame, chunks[0], city_totals, theme);
    render_metric_chart(frame, chunks[1], metric_totals, theme);
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use tracker_core::models::{GapMetric, HubRecord};
    use tracker_data::aggregator::{per_city_totals, per_metric_totals};

    fn records() -> Vec<HubRecord> {
        let mk = |hub: &str, city: &str, rd: i64, gap_total: i64| HubRecord {
            hub_name: hub.to_string(),
            city: city.to_string(),
            rd,
            rm: 1,
            dd: 0,
            dm: 0,
            crm: 0,
            cdm: 0,
            gap_total,
            pic_bpom: String::new(),
            notes: String::new(),
        };
        vec![
            mk("A", "Metro", 2, 4),
            mk("B", "Bandar Lampung", 5, 1_200),
            mk("C", "Metro", 1, 3),
        ]
    }

    #[test]
    fn test_city_axis_max_has_headroom() {
        let totals = per_city_totals(&records());
        // 1,200 × 1.10 = 1,320
        assert_eq!(city_axis_max(&totals), 1_320);
    }

    #[test]
    fn test_city_axis_max_empty_and_zero() {
        assert_eq!(city_axis_max(&per_city_totals(&[])), 1);
        let mut zero = records();
        for r in &mut zero {
            r.gap_total = 0;
        }
        assert_eq!(city_axis_max(&per_city_totals(&zero)), 1);
    }

    #[test]
    fn test_negative_totals_clamped() {
        assert_eq!(bar_value(-5), 0);
        assert_eq!(bar_value(7), 7);
    }

    #[test]
    fn test_city_bars_follow_sorted_order() {
        let totals = per_city_totals(&records());
        let bars = city_bars(&totals, &Theme::dark());
        assert_eq!(bars.len(), 2);
        assert_eq!(totals.entries[0].city, "Bandar Lampung");
        assert_eq!(totals.entries[0].label(), "1,200");
    }

    #[test]
    fn test_metric_bars_six_entries() {
        let totals = per_metric_totals(&records());
        assert_eq!(metric_bars(&totals, &Theme::dark()).len(), 6);
        assert_eq!(totals[0].metric, GapMetric::Rd);
    }

    #[test]
    fn test_render_global_view_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let theme = Theme::dark();
        let recs = records();
        let cities = per_city_totals(&recs);
        let metrics = per_metric_totals(&recs);

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_global_view(frame, area, &cities, &metrics, &theme);
            })
            .unwrap();
    }

    #[test]
    fn test_render_global_view_empty_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        let theme = Theme::classic();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_global_view(frame, area, &CityTotals::default(), &[], &theme);
            })
            .unwrap();
    }
}
