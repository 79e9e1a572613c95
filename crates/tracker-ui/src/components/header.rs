use chrono::{DateTime, Utc};
use ratatui::text::{Line, Span};

use tracker_core::models::LastUpdate;

use crate::themes::Theme;

/// Width of the `=` rule under the title.
pub const SEPARATOR_WIDTH: usize = 60;

/// Dashboard header rendering four lines:
///
/// 1. Dashboard title.
/// 2. A 60-column `=` separator.
/// 3. `[ region | Last update: marker | refreshed HH:MM:SS UTC ]`.
/// 4. An empty line.
pub struct Header<'a> {
    pub title: &'a str,
    pub region: &'a str,
    /// `None` until the first snapshot arrives.
    pub last_update: Option<&'a LastUpdate>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(title: &'a str, region: &'a str, theme: &'a Theme) -> Self {
        Self {
            title,
            region,
            last_update: None,
            refreshed_at: None,
            theme,
        }
    }

    /// Attach the marker and timestamp of the current snapshot.
    pub fn with_snapshot(mut self, last_update: &'a LastUpdate, refreshed_at: DateTime<Utc>) -> Self {
        self.last_update = Some(last_update);
        self.refreshed_at = Some(refreshed_at);
        self
    }

    fn marker_span(&self) -> Span<'a> {
        match self.last_update {
            None => Span::styled("loading…", self.theme.dim),
            Some(LastUpdate::Value(v)) => Span::styled(v.as_str(), self.theme.value),
            Some(LastUpdate::Empty) => Span::styled("not set", self.theme.dim),
            Some(LastUpdate::FetchFailed) => {
                Span::styled(LastUpdate::FETCH_FAILED_TEXT, self.theme.error)
            }
        }
    }

    /// Render the header as exactly four lines.
    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let mut info = vec![
            Span::styled("[ ", self.theme.label),
            Span::styled(self.region, self.theme.value),
            Span::styled(" | Last update: ", self.theme.label),
            self.marker_span(),
        ];
        if let Some(at) = self.refreshed_at {
            info.push(Span::styled(" | refreshed ", self.theme.label));
            info.push(Span::styled(
                at.format("%H:%M:%S UTC").to_string(),
                self.theme.dim,
            ));
        }
        info.push(Span::styled(" ]", self.theme.label));

        vec![
            Line::from(Span::styled(self.title, self.theme.header)),
            Line::from(Span::styled("=".repeat(SEPARATOR_WIDTH), self.theme.separator)),
            Line::from(info),
            Line::from(""),
        ]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
