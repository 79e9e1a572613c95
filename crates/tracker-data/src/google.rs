//! Google Sheets REST (v4) backend.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use tracker_core::error::{Result, TrackerError};
use tracker_core::models::{CellAddress, RawGrid, SheetRef, WorksheetId};

use crate::source::SheetSource;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

// ── Credentials ───────────────────────────────────────────────────────────────

/// How requests are authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Sent as the `key` query parameter. Only works for link-shared sheets.
    ApiKey(String),
    /// OAuth access token sent as `Authorization: Bearer`.
    BearerToken(String),
}

impl Credentials {
    /// Pick credentials from the configured values; a token wins over a key.
    pub fn from_parts(api_key: Option<String>, access_token: Option<String>) -> Option<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        non_empty(access_token)
            .map(Credentials::BearerToken)
            .or_else(|| non_empty(api_key).map(Credentials::ApiKey))
    }

    fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Credentials::ApiKey(key) => req.query(&[("key", key)]),
            Credentials::BearerToken(token) => req.bearer_auth(token),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.write_str("ApiKey(***)"),
            Credentials::BearerToken(_) => f.write_str("BearerToken(***)"),
        }
    }
}

// ── Payloads ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: u64,
    title: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Pad every row with empty cells up to the widest row.
pub fn pad_rows(mut grid: RawGrid) -> RawGrid {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut grid {
        row.resize(width, String::new());
    }
    grid
}

/// Decode a `ValueRange` body into a padded grid. A range with no values
/// decodes to an empty grid.
pub fn parse_values_response(body: &str) -> Result<RawGrid> {
    let range: ValueRange = serde_json::from_str(body)
        .map_err(|e| TrackerError::GenericFetch(format!("invalid values payload: {e}")))?;
    let grid = range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_string).collect())
        .collect();
    Ok(pad_rows(grid))
}

/// Title of the worksheet with numeric id `gid` in a metadata body.
pub fn find_sheet_title(body: &str, gid: u64) -> Result<String> {
    let meta: SpreadsheetMeta = serde_json::from_str(body)
        .map_err(|e| TrackerError::GenericFetch(format!("invalid spreadsheet metadata: {e}")))?;
    meta.sheets
        .into_iter()
        .map(|s| s.properties)
        .find(|p| p.sheet_id == gid)
        .map(|p| p.title)
        .ok_or_else(|| TrackerError::GenericFetch(format!("worksheet gid={gid} not found")))
}

/// Map a response status to the error taxonomy. 401/403 are access
/// problems; any other non-success status is a generic failure.
pub fn classify_status(status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    let reason = format!("HTTP {}: {}", status.as_u16(), detail.trim());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TrackerError::AuthAccess(reason)),
        _ => Err(TrackerError::GenericFetch(reason)),
    }
}

/// A1 range covering a whole worksheet, or one cell of it.
pub fn quoted_range(title: &str, cell: Option<CellAddress>) -> String {
    let quoted = format!("'{}'", title.replace('\'', "''"));
    match cell {
        Some(c) => format!("{quoted}!{}", c.to_a1()),
        None => quoted,
    }
}

// ── GoogleSheetsSource ────────────────────────────────────────────────────────

/// Reads worksheets through the Sheets REST API.
///
/// Titles resolved from a gid are remembered, so the metadata endpoint is
/// only hit once per worksheet. A failed values read forgets the title in
/// case the worksheet was renamed.
pub struct GoogleSheetsSource {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
    titles: Mutex<HashMap<SheetRef, String>>,
}

impl GoogleSheetsSource {
    pub fn new(credentials: Option<Credentials>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TrackerError::GenericFetch(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials,
            titles: Mutex::new(HashMap::new()),
        })
    }

    /// Point requests at another host (used against local stubs).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `{base}/v4/spreadsheets/{segments...}` with each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| TrackerError::Config(format!("invalid API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| TrackerError::Config(format!("API base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url, query: &[(&str, &str)]) -> Result<String> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            TrackerError::AuthAccess("no API key or access token configured".to_string())
        })?;

        debug!(path = url.path(), "sheets request");
        let request = credentials.apply(self.client.get(url).query(query));
        let response = request
            .send()
            .await
            .map_err(|e| TrackerError::GenericFetch(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TrackerError::GenericFetch(format!("reading response failed: {e}")))?;
        if let Err(e) = classify_status(status, &body) {
            warn!(status = status.as_u16(), error = %e, "sheets request rejected");
            return Err(e);
        }
        Ok(body)
    }

    fn cached_title(&self, sheet: &SheetRef) -> Option<String> {
        self.titles.lock().ok()?.get(sheet).cloned()
    }

    fn remember_title(&self, sheet: &SheetRef, title: &str) {
        if let Ok(mut titles) = self.titles.lock() {
            titles.insert(sheet.clone(), title.to_string());
        }
    }

    fn forget_title(&self, sheet: &SheetRef) {
        if let Ok(mut titles) = self.titles.lock() {
            titles.remove(sheet);
        }
    }

    /// Worksheet title for `sheet`, resolving a gid through the metadata endpoint.
    async fn resolve_title(&self, sheet: &SheetRef) -> Result<String> {
        match &sheet.worksheet {
            WorksheetId::Title(title) => Ok(title.clone()),
            WorksheetId::Gid(gid) => {
                if let Some(title) = self.cached_title(sheet) {
                    return Ok(title);
                }
                let url = self.endpoint(&[&sheet.spreadsheet_id])?;
                let body = self
                    .get(url, &[("fields", "sheets.properties(sheetId,title)")])
                    .await?;
                let title = find_sheet_title(&body, *gid)?;
                debug!(gid = *gid, title = %title, "worksheet title resolved");
                self.remember_title(sheet, &title);
                Ok(title)
            }
        }
    }

    async fn fetch_range(&self, sheet: &SheetRef, cell: Option<CellAddress>) -> Result<RawGrid> {
        let title = self.resolve_title(sheet).await?;
        let range = quoted_range(&title, cell);
        let url = self.endpoint(&[&sheet.spreadsheet_id, "values", &range])?;
        let body = match self.get(url, &[("majorDimension", "ROWS")]).await {
            Ok(body) => body,
            Err(e) => {
                self.forget_title(sheet);
                return Err(e);
            }
        };
        parse_values_response(&body)
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsSource {
    async fn fetch_all_values(&self, sheet: &SheetRef) -> Result<RawGrid> {
        self.fetch_range(sheet, None).await
    }

    async fn fetch_cell(&self, sheet: &SheetRef, cell: CellAddress) -> Result<Option<String>> {
        let grid = self.fetch_range(sheet, Some(cell)).await?;
        Ok(grid
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .filter(|v| !v.is_empty()))
    }

    fn name(&self) -> &'static str {
        "google-sheets"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values_pads_ragged_rows() {
        let body = r#"{"range":"'Hubs'!A1:C2","majorDimension":"ROWS","values":[["a","b","c"],["d"]]}"#;
        let grid = parse_values_response(body).unwrap();
        assert_eq!(grid, vec![vec!["a", "b", "c"], vec!["d", "", ""]]);
    }

    #[test]
    fn test_parse_values_missing_values_is_empty() {
        let grid = parse_values_response(r#"{"range":"'Hubs'!Y1"}"#).unwrap();
        assert!(grid.is_empty());
    }

    #[test]
    fn test_parse_values_stringifies_non_strings() {
        let grid = parse_values_response(r#"{"values":[[5, true, null]]}"#).unwrap();
        assert_eq!(grid, vec![vec!["5", "true", ""]]);
    }

    #[test]
    fn test_parse_values_invalid_json() {
        assert!(matches!(
            parse_values_response("<html>"),
            Err(TrackerError::GenericFetch(_))
        ));
    }

    #[test]
    fn test_find_sheet_title() {
        let body = r#"{"sheets":[
            {"properties":{"sheetId":0,"title":"Ringkasan"}},
            {"properties":{"sheetId":1234,"title":"Hubs"}}
        ]}"#;
        assert_eq!(find_sheet_title(body, 1234).unwrap(), "Hubs");
        assert!(matches!(
            find_sheet_title(body, 99),
            Err(TrackerError::GenericFetch(_))
        ));
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::OK, "").is_ok());

        let forbidden = r#"{"error":{"code":403,"message":"The caller does not have permission"}}"#;
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, forbidden),
            Err(TrackerError::AuthAccess(
                "HTTP 403: The caller does not have permission".to_string()
            ))
        );
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            Err(TrackerError::AuthAccess(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, "not found"),
            Err(TrackerError::GenericFetch(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, ""),
            Err(TrackerError::GenericFetch(_))
        ));
    }

    #[test]
    fn test_quoted_range() {
        assert_eq!(quoted_range("Hubs", None), "'Hubs'");
        assert_eq!(
            quoted_range("Data Hub's", Some(CellAddress { row: 0, col: 24 })),
            "'Data Hub''s'!Y1"
        );
    }

    #[test]
    fn test_endpoint_encodes_range() {
        let source = GoogleSheetsSource::new(None)
            .unwrap()
            .with_base_url("http://127.0.0.1:9/");
        let url = source.endpoint(&["abc", "values", "'My Sheet'!Y1"]).unwrap();
        assert_eq!(url.path(), "/v4/spreadsheets/abc/values/'My%20Sheet'!Y1");
    }

    #[test]
    fn test_credentials_prefer_token() {
        assert_eq!(
            Credentials::from_parts(Some("k".into()), Some("t".into())),
            Some(Credentials::BearerToken("t".into()))
        );
        assert_eq!(
            Credentials::from_parts(Some("k".into()), Some("  ".into())),
            Some(Credentials::ApiKey("k".into()))
        );
        assert_eq!(Credentials::from_parts(None, None), None);
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let dbg = format!("{:?}", Credentials::ApiKey("secret".into()));
        assert!(!dbg.contains("secret"));
    }

    #[tokio::test]
    async fn test_resolved_title_is_reused() {
        // No credentials: any request would fail, so success means no request.
        let source = GoogleSheetsSource::new(None)
            .unwrap()
            .with_base_url("http://127.0.0.1:9/");
        let sheet = SheetRef::new("abc", WorksheetId::Gid(1234));
        source.remember_title(&sheet, "Hubs");

        assert_eq!(source.resolve_title(&sheet).await.unwrap(), "Hubs");

        let other_tab = SheetRef::new("abc", WorksheetId::Gid(99));
        assert!(matches!(
            source.resolve_title(&other_tab).await,
            Err(TrackerError::AuthAccess(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_values_read_forgets_title() {
        let source = GoogleSheetsSource::new(None)
            .unwrap()
            .with_base_url("http://127.0.0.1:9/");
        let sheet = SheetRef::new("abc", WorksheetId::Gid(1234));
        source.remember_title(&sheet, "Hubs");

        assert!(source.fetch_all_values(&sheet).await.is_err());
        assert_eq!(source.cached_title(&sheet), None);
    }

    #[tokio::test]
    async fn test_missing_credentials_is_auth_error() {
        let source = GoogleSheetsSource::new(None)
            .unwrap()
            .with_base_url("http://127.0.0.1:9/");
        let sheet = SheetRef::new("abc", WorksheetId::Gid(0));
        let err = source.fetch_all_values(&sheet).await.unwrap_err();
        assert!(matches!(err, TrackerError::AuthAccess(_)));
    }
}
