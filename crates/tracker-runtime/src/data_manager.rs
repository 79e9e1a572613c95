//! TTL-cached sheet reads for the refresh loop.
//!
//! Wraps a [`SheetSource`] with a time-to-live cache keyed by [`SheetRef`]
//! and retry with back-off. Callers use [`DataManager::get_fetch`] to obtain
//! a fresh-or-cached [`SheetFetch`]; a failed read is returned as an error
//! and never masked by stale data.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracker_core::error::{Result, TrackerError};
use tracker_core::models::SheetRef;
use tracker_data::source::{fetch_sheet, SheetFetch, SheetSource};

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default cache TTL in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;

/// Maximum number of read attempts per refresh.
const MAX_RETRY_ATTEMPTS: u32 = 3;

struct CacheEntry {
    fetch: SheetFetch,
    stored_at: Instant,
}

// ── DataManager ───────────────────────────────────────────────────────────────

/// TTL-cached wrapper around a sheet backend.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use tracker_core::models::{SheetRef, WorksheetId};
/// use tracker_data::csv_source::CsvGridSource;
/// use tracker_runtime::data_manager::DataManager;
///
/// # async fn run() {
/// let source = Arc::new(CsvGridSource::new("hubs.csv"));
/// let mut mgr = DataManager::new(source, SheetRef::new("local", WorksheetId::Gid(0)), 600);
/// if let Ok(fetch) = mgr.get_fetch(false).await {
///     println!("rows: {}", fetch.grid.len());
/// }
/// # }
/// ```
pub struct DataManager {
    source: Arc<dyn SheetSource>,
    sheet: SheetRef,
    /// Maximum age of a cached read before it is considered stale.
    cache_ttl: Duration,
    cache: HashMap<SheetRef, CacheEntry>,
}

impl DataManager {
    pub fn new(source: Arc<dyn SheetSource>, sheet: SheetRef, cache_ttl_secs: u64) -> Self {
        Self {
            source,
            sheet,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache: HashMap::new(),
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the sheet read, using the cache while it is within its TTL.
    ///
    /// `force_refresh` bypasses the cache. Reads are attempted up to
    /// [`MAX_RETRY_ATTEMPTS`] times (0 ms → 100 ms → 200 ms back-off);
    /// access errors are returned immediately.
    pub async fn get_fetch(&mut self, force_refresh: bool) -> Result<SheetFetch> {
        if !force_refresh {
            if let Some(entry) = self.valid_entry() {
                tracing::debug!(sheet = %self.sheet, "returning cached sheet read");
                return Ok(entry.fetch.clone());
            }
        }

        match self.fetch_with_retry().await {
            Ok(fetch) => {
                tracing::debug!(sheet = %self.sheet, rows = fetch.grid.len(), "sheet cache updated");
                self.cache.insert(
                    self.sheet.clone(),
                    CacheEntry {
                        fetch: fetch.clone(),
                        stored_at: Instant::now(),
                    },
                );
                Ok(fetch)
            }
            Err(e) => {
                tracing::warn!(sheet = %self.sheet, error = %e, "sheet read failed");
                Err(e)
            }
        }
    }

    /// Age of the cached read for the configured sheet.
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache.get(&self.sheet).map(|e| e.stored_at.elapsed())
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn valid_entry(&self) -> Option<&CacheEntry> {
        self.cache
            .get(&self.sheet)
            .filter(|e| e.stored_at.elapsed() < self.cache_ttl)
    }

    async fn fetch_with_retry(&self) -> Result<SheetFetch> {
        let mut last_err = None;

        for attempt in 0..MAX_RETRY_ATTEMPTS {
            if attempt > 0 {
                let sleep_ms = (attempt as u64) * 100;
                tracing::debug!(attempt, sleep_ms, "retrying sheet read after back-off");
                tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
            }

            match fetch_sheet(self.source.as_ref(), &self.sheet).await {
                Ok(fetch) => return Ok(fetch),
                Err(e @ TrackerError::AuthAccess(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "sheet read attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| TrackerError::GenericFetch("no read attempted".to_string())))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
