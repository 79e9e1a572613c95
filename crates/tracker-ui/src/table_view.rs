//! Hub table view and the placeholder panels shown in its place.
//!
//! Renders a bordered [`ratatui::widgets::Table`] with one row per hub in
//! sheet order, using the display column order of the normalized table.

use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use tracker_core::error::TrackerError;
use tracker_core::models::{HubRecord, DISPLAY_COLUMNS};

use crate::themes::Theme;

/// Column widths, in display order.
const COLUMN_WIDTHS: [u16; 11] = [24, 18, 5, 5, 5, 5, 5, 5, 9, 14, 30];

/// Index of the `GAP TOTAL` display column.
const GAP_TOTAL_COLUMN: usize = 8;

/// Cut `text` to at most `max_width` terminal columns, marking the cut with `…`.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > max_width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn hub_row<'a>(index: usize, record: &HubRecord, theme: &Theme) -> Row<'a> {
    let cells = record
        .display_cells()
        .into_iter()
        .zip(COLUMN_WIDTHS)
        .enumerate()
        .map(|(col, (text, width))| {
            let cell = Cell::from(truncate_to_width(&text, width as usize));
            if col == GAP_TOTAL_COLUMN {
                cell.style(theme.gap_style(record.gap_total))
            } else {
                cell
            }
        });
    Row::new(cells).style(theme.row_style(index))
}

/// Render the hub table into `area`.
pub fn render_hub_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    records: &[HubRecord],
    theme: &Theme,
) {
    let header = Row::new(
        DISPLAY_COLUMNS
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    )
    .height(1);

    let rows: Vec<Row> = records
        .iter()
        .enumerate()
        .map(|(i, r)| hub_row(i, r, theme))
        .collect();

    let widths = COLUMN_WIDTHS.iter().enumerate().map(|(i, &w)| {
        if i == COLUMN_WIDTHS.len() - 1 {
            Constraint::Min(w)
        } else {
            Constraint::Length(w)
        }
    });

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} · {} hubs ", title, records.len())),
        )
        .style(theme.text);

    frame.render_widget(table, area);
}

fn render_panel(frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line>) {
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {title} ")),
            ),
        area,
    );
}

/// Placeholder while the first snapshot is being read.
pub fn render_loading(frame: &mut Frame, area: Rect, theme: &Theme) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("Reading sheet…", theme.info)),
    ];
    render_panel(frame, area, "Hub Tracker", lines);
}

/// Placeholder when the sheet was read but no hub matched the region.
pub fn render_no_data(frame: &mut Frame, area: Rect, region: &str, theme: &Theme) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("No hub rows found for region {region}"),
            theme.warning,
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Check the region filter and the sheet's PROVINSI column.",
            theme.dim,
        )),
        Line::from(Span::styled("Press 'r' to refresh, 'q' to exit", theme.dim)),
    ];
    render_panel(frame, area, "Hub Tracker", lines);
}

/// Panel describing why the table is empty.
pub fn render_error(frame: &mut Frame, area: Rect, error: &TrackerError, theme: &Theme) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(error.user_message(), theme.error)),
        Line::from(""),
        Line::from(Span::styled(error.to_string(), theme.dim)),
        Line::from(Span::styled("Press 'r' to retry, 'q' to exit", theme.dim)),
    ];
    render_panel(frame, area, "Error", lines);
}

// ── Tests ──────────────────────────────────────────────────────────────────────
