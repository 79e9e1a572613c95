//! Application state and TUI event loop for the hub tracker.
//!
//! [`App`] owns the theme, the active tab and the last received dashboard
//! snapshot. Key handling is separated from terminal I/O so it can be
//! exercised without a terminal.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Tabs},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use tracker_data::extractor::SnapshotStatus;
use tracker_runtime::orchestrator::{DashboardData, RefreshHandle};

use crate::chart_view;
use crate::components::header::Header;
use crate::table_view;
use crate::themes::Theme;

// ── Tab ───────────────────────────────────────────────────────────────────────

/// The two dashboard pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    /// Hub-level table.
    #[default]
    HubTracker,
    /// City and metric bar charts.
    GlobalView,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::HubTracker, Tab::GlobalView];

    pub fn title(self) -> &'static str {
        match self {
            Tab::HubTracker => "Hub Tracker",
            Tab::GlobalView => "Global View",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::HubTracker => 0,
            Tab::GlobalView => 1,
        }
    }

    /// The other tab; there are only two.
    pub fn toggle(self) -> Self {
        match self {
            Tab::HubTracker => Tab::GlobalView,
            Tab::GlobalView => Tab::HubTracker,
        }
    }
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    None,
    Quit,
    Refresh,
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the dashboard TUI.
pub struct App {
    pub theme: Theme,
    /// Dashboard title, e.g. `"TRACKER NEEDS LAMPUNG"`.
    pub title: String,
    pub region: String,
    pub active_tab: Tab,
    pub should_quit: bool,
    /// Most recent snapshot, `None` until the first pass completes.
    pub last_data: Option<DashboardData>,
}

impl App {
    pub fn new(theme_name: &str, title: String, region: String) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            title,
            region,
            active_tab: Tab::default(),
            should_quit: false,
            last_data: None,
        }
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Run the dashboard, receiving snapshots from `rx`.
    ///
    /// Uses `crossterm::event::poll` with a 250 ms timeout so key handling
    /// stays on the current thread while snapshots arrive on the channel via
    /// `try_recv`. Exits on `q`, `Q`, `Ctrl+C`, or when the channel closes.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<DashboardData>,
        refresh: &RefreshHandle,
    ) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => match self.handle_key(key) {
                        AppAction::Quit => break Ok(()),
                        AppAction::Refresh => refresh.request_refresh(),
                        AppAction::None => {}
                    },
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            loop {
                match rx.try_recv() {
                    Ok(data) => self.update(data),
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        self.should_quit = true;
                        break;
                    }
                }
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    // ── State transitions ─────────────────────────────────────────────────────

    /// Map a key press to a state change and a loop action.
    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.kind != KeyEventKind::Press {
            return AppAction::None;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                AppAction::Quit
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
                AppAction::Quit
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right => {
                self.active_tab = self.active_tab.toggle();
                AppAction::None
            }
            KeyCode::Char('1') => {
                self.active_tab = Tab::HubTracker;
                AppAction::None
            }
            KeyCode::Char('2') => {
                self.active_tab = Tab::GlobalView;
                AppAction::None
            }
            KeyCode::Char('r') | KeyCode::Char('R') => AppAction::Refresh,
            _ => AppAction::None,
        }
    }

    /// Replace the displayed snapshot.
    pub fn update(&mut self, data: DashboardData) {
        self.last_data = Some(data);
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    /// Render header, tab bar, the active page and the key hints.
    pub fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let mut header = Header::new(&self.title, &self.region, &self.theme);
        if let Some(data) = &self.last_data {
            header = header.with_snapshot(&data.snapshot.last_update, data.refreshed_at);
        }
        frame.render_widget(Paragraph::new(header.to_lines()), chunks[0]);

        let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()))
            .select(self.active_tab.index())
            .style(self.theme.tab)
            .highlight_style(self.theme.tab_active)
            .divider(Span::styled("|", self.theme.separator));
        frame.render_widget(tabs, chunks[1]);

        self.render_body(frame, chunks[2]);

        let hints = Line::from(Span::styled(
            "q quit · Tab/←/→ switch page · r refresh",
            self.theme.dim,
        ));
        frame.render_widget(Paragraph::new(hints), chunks[3]);
    }

    fn render_body(&self, frame: &mut Frame, area: Rect) {
        let Some(data) = &self.last_data else {
            table_view::render_loading(frame, area, &self.theme);
            return;
        };

        match &data.snapshot.status {
            SnapshotStatus::Failed(e) => table_view::render_error(frame, area, e, &self.theme),
            SnapshotStatus::NoMatchingRows => {
                table_view::render_no_data(frame, area, &self.region, &self.theme)
            }
            SnapshotStatus::Ready => match self.active_tab {
                Tab::HubTracker => table_view::render_hub_table(
                    frame,
                    area,
                    &format!("All Hubs {}", self.region),
                    &data.snapshot.records,
                    &self.theme,
                ),
                Tab::GlobalView => chart_view::render_global_view(
                    frame,
                    area,
                    &data.city_totals,
                    &data.metric_totals,
                    &self.theme,
                ),
            },
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use tracker_core::error::TrackerError;
    use tracker_core::models::{HubRecord, LastUpdate};
    use tracker_data::extractor::HubSnapshot;

    fn app() -> App {
        App::new("dark", "TRACKER NEEDS LAMPUNG".to_string(), "LAMPUNG".to_string())
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ready_data() -> DashboardData {
        let record = HubRecord {
            hub_name: "HubA".to_string(),
            city: "Bandar Lampung".to_string(),
            rd: 5,
            rm: 3,
            dd: 0,
            dm: 2,
            crm: 1,
            cdm: 0,
            gap_total: 11,
            pic_bpom: "PIC1".to_string(),
            notes: "note".to_string(),
        };
        DashboardData::from_snapshot(HubSnapshot {
            records: vec![record],
            last_update: LastUpdate::Value("Update 12 Mei".to_string()),
            status: SnapshotStatus::Ready,
        })
    }

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(160, 30)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    // ── Tab ───────────────────────────────────────────────────────────────────

    #[test]
    fn test_tab_titles_and_order() {
        let titles: Vec<&str> = Tab::ALL.iter().map(|t| t.title()).collect();
        assert_eq!(titles, vec!["Hub Tracker", "Global View"]);
        assert_eq!(Tab::default(), Tab::HubTracker);
    }

    #[test]
    fn test_tab_toggle() {
        assert_eq!(Tab::HubTracker.toggle(), Tab::GlobalView);
        assert_eq!(Tab::GlobalView.toggle(), Tab::HubTracker);
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    #[test]
    fn test_quit_keys() {
        let mut a = app();
        assert_eq!(a.handle_key(press(KeyCode::Char('q'))), AppAction::Quit);
        assert!(a.should_quit);

        let mut a = app();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(a.handle_key(ctrl_c), AppAction::Quit);

        let mut a = app();
        assert_eq!(a.handle_key(press(KeyCode::Char('c'))), AppAction::None);
        assert!(!a.should_quit);
    }

    #[test]
    fn test_tab_switching_keys() {
        let mut a = app();
        a.handle_key(press(KeyCode::Tab));
        assert_eq!(a.active_tab, Tab::GlobalView);
        a.handle_key(press(KeyCode::Right));
        assert_eq!(a.active_tab, Tab::HubTracker);
        a.handle_key(press(KeyCode::Char('2')));
        assert_eq!(a.active_tab, Tab::GlobalView);
        a.handle_key(press(KeyCode::Char('1')));
        assert_eq!(a.active_tab, Tab::HubTracker);
    }

    #[test]
    fn test_refresh_key() {
        let mut a = app();
        assert_eq!(a.handle_key(press(KeyCode::Char('r'))), AppAction::Refresh);
    }

    #[test]
    fn test_key_release_ignored() {
        let mut a = app();
        let mut key = press(KeyCode::Char('q'));
        key.kind = KeyEventKind::Release;
        assert_eq!(a.handle_key(key), AppAction::None);
        assert!(!a.should_quit);
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    #[test]
    fn test_render_loading_state() {
        let text = draw(&app());
        assert!(text.contains("TRACKER NEEDS LAMPUNG"));
        assert!(text.contains("Reading sheet"));
    }

    #[test]
    fn test_render_hub_table_tab() {
        let mut a = app();
        a.update(ready_data());
        let text = draw(&a);
        assert!(text.contains("HubA"));
        assert!(text.contains("Update 12 Mei"));
    }

    #[test]
    fn test_render_global_view_tab() {
        let mut a = app();
        a.update(ready_data());
        a.active_tab = Tab::GlobalView;
        let text = draw(&a);
        assert!(text.contains("Total GAP Berdasarkan Kab/Kota"));
    }

    #[test]
    fn test_render_no_matching_rows() {
        let mut a = app();
        a.update(DashboardData::from_snapshot(HubSnapshot {
            records: Vec::new(),
            last_update: LastUpdate::Empty,
            status: SnapshotStatus::NoMatchingRows,
        }));
        assert!(draw(&a).contains("No hub rows found"));
    }

    #[test]
    fn test_render_fetch_failure_on_both_tabs() {
        let mut a = app();
        a.update(DashboardData::from_snapshot(HubSnapshot::fetch_failed(
            TrackerError::AuthAccess("HTTP 403".to_string()),
        )));
        let text = draw(&a);
        assert!(text.contains("fetch-failed"));
        assert!(text.contains("Authentication/access error"));

        a.active_tab = Tab::GlobalView;
        assert!(draw(&a).contains("Authentication/access error"));
    }
}
