use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tracker_core::settings::Settings;
use tracker_data::csv_source::CsvGridSource;
use tracker_data::google::{Credentials, GoogleSheetsSource};
use tracker_data::source::SheetSource;

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// `~/.hub-tracker`, or `./.hub-tracker` when no home directory is known.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hub-tracker")
}

/// Ensure `~/.hub-tracker/` and its `logs/` directory exist.
pub fn ensure_directories() -> anyhow::Result<PathBuf> {
    let dir = app_dir();
    std::fs::create_dir_all(dir.join("logs"))
        .with_context(|| format!("creating {}", dir.join("logs").display()))?;
    Ok(dir)
}

/// Log file used by the dashboard when `--log-file` is not given; the TUI
/// owns the terminal so logs cannot go to stderr.
pub fn default_log_file() -> PathBuf {
    app_dir().join("logs").join("hub-tracker.log")
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map the upper-case `--log-level` names to an `EnvFilter` directive.
pub fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        other => other.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// `RUST_LOG`, when set, overrides `log_level`. With `log_file` the output is
/// appended to that file without colours; otherwise it goes to stderr.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level_directive(log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let stderr_layer = log_file.is_none().then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}

// ── Source selection ───────────────────────────────────────────────────────────

/// The sheet backend selected by `settings`: a CSV export when `--csv` is
/// given, the Sheets API otherwise.
pub fn build_source(settings: &Settings) -> anyhow::Result<Arc<dyn SheetSource>> {
    if let Some(path) = &settings.csv {
        tracing::info!(path = %path.display(), "reading sheet from CSV export");
        return Ok(Arc::new(CsvGridSource::new(path)));
    }

    let credentials =
        Credentials::from_parts(settings.api_key.clone(), settings.access_token.clone());
    if credentials.is_none() {
        tracing::warn!("no API key or access token configured; sheet reads will fail");
    }
    Ok(Arc::new(GoogleSheetsSource::new(credentials)?))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
