//! Shared domain types for the hub tracker.
//!
//! Holds the sheet-facing data model, the error taxonomy, number formatting
//! and CLI settings used by every other crate in the workspace.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{Result, TrackerError};
