//! Async refresh orchestrator.
//!
//! Runs the read → normalize → aggregate pass in a tokio task on a fixed
//! interval, sending each immutable [`DashboardData`] through an `mpsc`
//! channel so the TUI event loop consumes snapshots without shared mutable
//! state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time;

use tracker_core::models::SheetRef;
use tracker_data::aggregator::{per_city_totals, per_metric_totals, CityTotals, MetricTotal};
use tracker_data::extractor::HubSnapshot;
use tracker_data::source::SheetSource;

use crate::data_manager::DataManager;

// ── Public types ──────────────────────────────────────────────────────────────

/// One dashboard state handed to the presentation layer.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub snapshot: HubSnapshot,
    pub city_totals: CityTotals,
    pub metric_totals: Vec<MetricTotal>,
    /// When this pass completed.
    pub refreshed_at: DateTime<Utc>,
}

impl DashboardData {
    /// Aggregate a snapshot into the full dashboard state.
    pub fn from_snapshot(snapshot: HubSnapshot) -> Self {
        let city_totals = per_city_totals(&snapshot.records);
        let metric_totals = per_metric_totals(&snapshot.records);
        Self {
            snapshot,
            city_totals,
            metric_totals,
            refreshed_at: Utc::now(),
        }
    }
}

/// Run one full pass through `data_manager` for `region`.
pub async fn build_dashboard(
    data_manager: &mut DataManager,
    region: &str,
    force: bool,
) -> DashboardData {
    let snapshot = HubSnapshot::from_fetch(data_manager.get_fetch(force).await, region);
    DashboardData::from_snapshot(snapshot)
}

// ── RefreshOrchestrator ───────────────────────────────────────────────────────

/// Background refresh coordinator.
///
/// Call [`RefreshOrchestrator::start`] to spin up the refresh loop in a
/// dedicated tokio task and receive a channel endpoint for [`DashboardData`]
/// updates.
pub struct RefreshOrchestrator {
    source: Arc<dyn SheetSource>,
    sheet: SheetRef,
    region: String,
    refresh_interval: Duration,
    cache_ttl_secs: u64,
}

impl RefreshOrchestrator {
    /// `region` must already be upper-case.
    pub fn new(
        source: Arc<dyn SheetSource>,
        sheet: SheetRef,
        region: impl Into<String>,
        refresh_interval_secs: u64,
        cache_ttl_secs: u64,
    ) -> Self {
        Self {
            source,
            sheet,
            region: region.into(),
            refresh_interval: Duration::from_secs(refresh_interval_secs),
            cache_ttl_secs,
        }
    }

    /// Start the refresh loop.
    ///
    /// Returns the snapshot receiver and a [`RefreshHandle`] for manual
    /// refreshes and shutdown.
    pub fn start(self) -> (mpsc::Receiver<DashboardData>, RefreshHandle) {
        let (tx, rx) = mpsc::channel(16);
        let (refresh_tx, refresh_rx) = mpsc::channel(4);

        let handle = tokio::spawn(async move {
            self.refresh_loop(tx, refresh_rx).await;
        });

        (
            rx,
            RefreshHandle {
                handle,
                refresh_tx,
            },
        )
    }

    // ── Private implementation ────────────────────────────────────────────

    /// Reads immediately on startup, then on every tick or manual request.
    /// Exits when the receiver side of the channel is closed.
    async fn refresh_loop(
        self,
        tx: mpsc::Sender<DashboardData>,
        mut refresh_rx: mpsc::Receiver<()>,
    ) {
        let mut data_manager =
            DataManager::new(self.source.clone(), self.sheet.clone(), self.cache_ttl_secs);

        self.refresh_and_send(&mut data_manager, &tx, true).await;

        let mut interval = time::interval(self.refresh_interval);
        // The first tick fires immediately; the initial read already ran.
        interval.tick().await;

        loop {
            let force = tokio::select! {
                _ = interval.tick() => false,
                request = refresh_rx.recv() => match request {
                    Some(()) => true,
                    None => {
                        tracing::debug!("refresh handle dropped; exiting loop");
                        break;
                    }
                },
            };

            if tx.is_closed() {
                tracing::debug!("dashboard channel closed; exiting loop");
                break;
            }

            self.refresh_and_send(&mut data_manager, &tx, force).await;
        }
    }

    async fn refresh_and_send(
        &self,
        data_manager: &mut DataManager,
        tx: &mpsc::Sender<DashboardData>,
        force: bool,
    ) {
        let data = build_dashboard(data_manager, &self.region, force).await;
        let cache_age_ms = data_manager.cache_age().map(|age| age.as_millis() as u64);
        tracing::info!(
            sheet = %self.sheet,
            cache_age_ms,
            hubs = data.snapshot.records.len(),
            cities = data.city_totals.entries.len(),
            failed = data.snapshot.error().is_some(),
            force,
            "dashboard refreshed"
        );

        if let Err(e) = tx.send(data).await {
            tracing::warn!(error = %e, "failed to send dashboard snapshot; receiver dropped");
        }
    }
}

// ── RefreshHandle ─────────────────────────────────────────────────────────────

/// A handle to the background refresh task.
pub struct RefreshHandle {
    handle: tokio::task::JoinHandle<()>,
    refresh_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Ask for an immediate read that bypasses the cache. Requests arriving
    /// while one is already queued are dropped.
    pub fn request_refresh(&self) {
        if self.refresh_tx.try_send(()).is_err() {
            tracing::debug!("refresh already pending");
        }
    }

    /// Immediately abort the refresh loop.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_manager::tests::CountingSource;
    use tracker_core::error::TrackerError;
    use tracker_core::models::{LastUpdate, RawGrid, WorksheetId};
    use tracker_data::extractor::SnapshotStatus;

    fn sheet() -> SheetRef {
        SheetRef::new("sheet-1", WorksheetId::Gid(0))
    }

    fn hub_row(hub: &str, region: &str, city: &str, gap_total: &str) -> Vec<String> {
        let mut row = vec![String::new(); 25];
        row[0] = hub.to_string();
        row[2] = region.to_string();
        row[3] = city.to_string();
        row[16] = "1".to_string();
        row[22] = gap_total.to_string();
        row
    }

    fn hub_grid() -> RawGrid {
        let mut grid = vec![vec![String::new(); 25]; 6];
        grid.push(hub_row("HubA", "Lampung", "Metro", "4"));
        grid.push(hub_row("HubB", "LAMPUNG", "Bandar Lampung", "10"));
        grid.push(hub_row("HubC", "lampung", "Metro", "3"));
        grid.push(hub_row("HubJ", "Jakarta", "Jakarta Pusat", "50"));
        grid
    }

    async fn first_snapshot(rx: &mut mpsc::Receiver<DashboardData>) -> DashboardData {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for snapshot")
            .expect("channel closed before receiving snapshot")
    }

    #[test]
    fn test_orchestrator_creation() {
        let source = Arc::new(CountingSource::ok(hub_grid()));
        let orch = RefreshOrchestrator::new(source, sheet(), "LAMPUNG", 60, 600);
        assert_eq!(orch.refresh_interval, Duration::from_secs(60));
        assert_eq!(orch.region, "LAMPUNG");
        assert_eq!(orch.cache_ttl_secs, 600);
    }

    #[test]
    fn test_dashboard_from_empty_snapshot() {
        let data = DashboardData::from_snapshot(HubSnapshot::fetch_failed(
            TrackerError::GenericFetch("offline".to_string()),
        ));
        assert!(data.city_totals.is_empty());
        assert_eq!(data.city_totals.axis_upper_bound, None);
        assert!(data.metric_totals.is_empty());
        assert_eq!(data.snapshot.last_update, LastUpdate::FetchFailed);
    }

    #[tokio::test]
    async fn test_orchestrator_sends_initial_snapshot() {
        let source = Arc::new(CountingSource::ok(hub_grid()));
        let orch = RefreshOrchestrator::new(source, sheet(), "LAMPUNG", 60, 600);
        let (mut rx, handle) = orch.start();

        let data = first_snapshot(&mut rx).await;
        assert_eq!(data.snapshot.status, SnapshotStatus::Ready);
        assert_eq!(data.snapshot.records.len(), 3);
        assert_eq!(data.city_totals.entries[0].city, "Bandar Lampung");
        assert_eq!(data.city_totals.max_total, Some(10));
        assert_eq!(data.metric_totals.len(), 6);
        assert_eq!(
            data.snapshot.last_update,
            LastUpdate::Value("Update 12 Mei".to_string())
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_manual_refresh_forces_read() {
        let source = Arc::new(CountingSource::ok(hub_grid()));
        let orch = RefreshOrchestrator::new(source.clone(), sheet(), "LAMPUNG", 3600, 600);
        let (mut rx, handle) = orch.start();

        first_snapshot(&mut rx).await;
        handle.request_refresh();
        first_snapshot(&mut rx).await;
        assert_eq!(source.reads(), 2);

        handle.abort();
    }

    #[tokio::test]
    async fn test_auth_failure_snapshot() {
        let source = Arc::new(CountingSource::failing(
            hub_grid(),
            usize::MAX,
            TrackerError::AuthAccess("HTTP 403".to_string()),
        ));
        let orch = RefreshOrchestrator::new(source.clone(), sheet(), "LAMPUNG", 60, 600);
        let (mut rx, handle) = orch.start();

        let data = first_snapshot(&mut rx).await;
        assert!(data.snapshot.is_empty());
        assert!(data.snapshot.last_update.is_fetch_failed());
        assert!(matches!(
            data.snapshot.error(),
            Some(TrackerError::AuthAccess(_))
        ));
        assert_eq!(source.reads(), 1);

        handle.abort();
    }

    #[tokio::test]
    async fn test_orchestrator_start_and_abort() {
        let source = Arc::new(CountingSource::ok(hub_grid()));
        let orch = RefreshOrchestrator::new(source, sheet(), "LAMPUNG", 60, 600);
        let (_rx, handle) = orch.start();

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
    }
}
