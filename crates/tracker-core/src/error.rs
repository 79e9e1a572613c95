use thiserror::Error;

/// All errors produced by the hub tracker.
///
/// Every variant carries owned text so the error can travel inside the
/// snapshots the runtime hands to the presentation layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// The sheet could not be read for authentication or permission reasons.
    #[error("Authentication/access error: {0}")]
    AuthAccess(String),

    /// Any other fetch failure (network, sheet or worksheet not found, bad payload).
    #[error("Failed to fetch sheet data: {0}")]
    GenericFetch(String),

    /// The grid has no data section below the header row.
    #[error("Sheet is too short: {rows} rows found, more than 6 required")]
    InsufficientData { rows: usize },

    /// The grid is narrower than the declared column schema.
    #[error("Sheet layout mismatch: {required} columns required, {found} found")]
    LayoutMismatch { required: usize, found: usize },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TrackerError {
    /// Operator-facing message for the dashboard.
    ///
    /// Authentication failures point at credentials and sharing settings
    /// rather than repeating the raw reason.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthAccess(_) => "Authentication/access error reading the sheet. \
                 Check the API key or access token and the sheet's sharing permissions."
                .to_string(),
            Self::GenericFetch(reason) => format!("Failed to load data. Error: {reason}"),
            Self::InsufficientData { .. } => "Sheet data is too short.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Convenience alias used throughout the tracker crates.
pub type Result<T> = std::result::Result<T, TrackerError>;
