mod bootstrap;

use anyhow::Result;
use serde_json::json;

use tracker_core::settings::Settings;
use tracker_data::extractor::SnapshotStatus;
use tracker_runtime::data_manager::DataManager;
use tracker_runtime::orchestrator::{build_dashboard, DashboardData, RefreshOrchestrator};
use tracker_ui::app::App;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    let log_file = match (&settings.log_file, settings.view.as_str()) {
        (Some(path), _) => Some(path.clone()),
        (None, "dashboard") => Some(bootstrap::default_log_file()),
        (None, _) => None,
    };
    bootstrap::setup_logging(&settings.log_level, log_file.as_deref())?;

    tracing::info!("Hub Tracker v{} starting", env!("CARGO_PKG_VERSION"));

    let sheet = settings.sheet_ref()?;
    let source = bootstrap::build_source(&settings)?;
    tracing::info!(
        sheet = %sheet,
        region = %settings.region,
        view = %settings.view,
        theme = %settings.theme,
        "configuration loaded"
    );

    match settings.view.as_str() {
        "dashboard" => {
            let orchestrator = RefreshOrchestrator::new(
                source,
                sheet,
                settings.region.clone(),
                u64::from(settings.refresh_rate),
                settings.cache_ttl,
            );
            let (rx, handle) = orchestrator.start();

            let app = App::new(
                &settings.theme,
                settings.display_title(),
                settings.region.clone(),
            );

            // Ctrl+C is also caught at the OS level in case the terminal is
            // not in raw mode yet.
            tokio::select! {
                result = app.run(rx, &handle) => {
                    handle.abort();
                    result?;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received; shutting down refresh task");
                    handle.abort();
                }
            }
        }

        "report" => {
            let mut data_manager = DataManager::new(source, sheet, settings.cache_ttl);
            let data = build_dashboard(&mut data_manager, &settings.region, true).await;

            println!(
                "{}",
                serde_json::to_string_pretty(&report_json(&settings, &data))?
            );

            if let Some(e) = data.snapshot.error() {
                anyhow::bail!(e.user_message());
            }
        }

        unknown => {
            anyhow::bail!("unknown view mode: {unknown}");
        }
    }

    Ok(())
}

/// One-shot JSON rendering of a dashboard pass.
fn report_json(settings: &Settings, data: &DashboardData) -> serde_json::Value {
    let status = match &data.snapshot.status {
        SnapshotStatus::Ready => json!({ "state": "ready" }),
        SnapshotStatus::NoMatchingRows => json!({ "state": "no_matching_rows" }),
        SnapshotStatus::Failed(e) => json!({
            "state": "failed",
            "error": e.to_string(),
            "message": e.user_message(),
        }),
    };

    let cities: Vec<serde_json::Value> = data
        .city_totals
        .entries
        .iter()
        .map(|e| json!({ "city": e.city, "total": e.total, "label": e.label() }))
        .collect();
    let metrics: Vec<serde_json::Value> = data
        .metric_totals
        .iter()
        .map(|t| json!({ "metric": t.metric, "total": t.total, "label": t.label() }))
        .collect();

    json!({
        "title": settings.display_title(),
        "region": settings.region,
        "refreshed_at": data.refreshed_at.to_rfc3339(),
        "last_update": data.snapshot.last_update.to_string(),
        "status": status,
        "hubs": data.snapshot.records,
        "city_totals": {
            "entries": cities,
            "max_total": data.city_totals.max_total,
            "axis_upper_bound": data.city_totals.axis_upper_bound,
        },
        "metric_totals": metrics,
    })
}
