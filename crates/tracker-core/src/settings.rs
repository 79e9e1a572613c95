use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, TrackerError};
use crate::models::{SheetRef, WorksheetId};

/// Region matched when none is configured.
pub const DEFAULT_REGION: &str = "LAMPUNG";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Hub gap tracker dashboard backed by a shared spreadsheet
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hub-tracker",
    about = "Hub gap tracker dashboard backed by a shared spreadsheet",
    version
)]
pub struct Settings {
    /// Spreadsheet id (the long key in the sheet URL)
    #[arg(long, env = "HUB_TRACKER_SHEET_ID")]
    pub sheet_id: Option<String>,

    /// Worksheet gid (the `gid=` URL parameter)
    #[arg(long)]
    pub worksheet_gid: Option<u64>,

    /// Worksheet title; takes precedence over --worksheet-gid
    #[arg(long)]
    pub worksheet: Option<String>,

    /// Read a CSV export of the worksheet instead of the live sheet
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Google API key for the Sheets API
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// OAuth access token for the Sheets API
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Region whose hubs are shown
    #[arg(long, default_value = DEFAULT_REGION)]
    pub region: String,

    /// Dashboard title (defaults to "TRACKER NEEDS <REGION>")
    #[arg(long)]
    pub title: Option<String>,

    /// View mode
    #[arg(long, default_value = "dashboard", value_parser = ["dashboard", "report"])]
    pub view: String,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Refresh rate in seconds (10-3600)
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u32).range(10..=3600))]
    pub refresh_rate: u32,

    /// Seconds a fetched sheet is reused before it is read again
    #[arg(long, default_value = "600")]
    pub cache_ttl: u64,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.hub-tracker/last_used.json`.
///
/// Credentials are never persisted.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worksheet_gid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worksheet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<u64>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    /// Uses `~/.hub-tracker/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".hub-tracker").join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load persisted params from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, normalise values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "failed to clear saved configuration");
            }
            return Self::normalize(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI (and env) always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "sheet_id") && settings.sheet_id.is_none() {
            settings.sheet_id = last.sheet_id;
        }
        // The worksheet is only inherited together with the sheet it belongs to.
        let sheet_from_cli = is_arg_explicitly_set(&matches, "sheet_id");
        if !sheet_from_cli
            && !is_arg_explicitly_set(&matches, "worksheet")
            && !is_arg_explicitly_set(&matches, "worksheet_gid")
        {
            if settings.worksheet.is_none() {
                settings.worksheet = last.worksheet;
            }
            if settings.worksheet_gid.is_none() {
                settings.worksheet_gid = last.worksheet_gid;
            }
        }
        if !is_arg_explicitly_set(&matches, "region") {
            if let Some(v) = last.region {
                settings.region = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "refresh_rate") {
            if let Some(v) = last.refresh_rate {
                settings.refresh_rate = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "cache_ttl") {
            if let Some(v) = last.cache_ttl {
                settings.cache_ttl = v;
            }
        }

        settings = Self::normalize(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(error = %e, path = %config_path.display(), "failed to persist settings");
        }

        settings
    }

    /// Upper-case the region and apply the `--debug` flag.
    fn normalize(mut settings: Settings) -> Settings {
        settings.region = settings.region.trim().to_uppercase();
        if settings.region.is_empty() {
            settings.region = DEFAULT_REGION.to_string();
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    /// Dashboard title, derived from the region unless configured.
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(t) if !t.trim().is_empty() => t.clone(),
            _ => format!("TRACKER NEEDS {}", self.region),
        }
    }

    /// Which worksheet to read.
    ///
    /// A CSV export is addressed by its path. A live sheet needs `--sheet-id`;
    /// the worksheet defaults to gid 0, the first tab of a new spreadsheet.
    pub fn sheet_ref(&self) -> Result<SheetRef> {
        if let Some(path) = &self.csv {
            return Ok(SheetRef::new(
                path.display().to_string(),
                WorksheetId::Gid(0),
            ));
        }

        let sheet_id = self
            .sheet_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                TrackerError::Config(
                    "no sheet configured: pass --sheet-id (or HUB_TRACKER_SHEET_ID) or --csv"
                        .to_string(),
                )
            })?;

        let worksheet = match (&self.worksheet, self.worksheet_gid) {
            (Some(title), _) if !title.trim().is_empty() => WorksheetId::Title(title.clone()),
            (_, Some(gid)) => WorksheetId::Gid(gid),
            _ => WorksheetId::Gid(0),
        };

        Ok(SheetRef::new(sheet_id, worksheet))
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            sheet_id: s.sheet_id.clone(),
            worksheet_gid: s.worksheet_gid,
            worksheet: s.worksheet.clone(),
            region: Some(s.region.clone()),
            theme: Some(s.theme.clone()),
            view: Some(s.view.clone()),
            refresh_rate: Some(s.refresh_rate),
            cache_ttl: Some(s.cache_ttl),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
