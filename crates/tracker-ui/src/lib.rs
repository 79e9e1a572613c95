//! Terminal UI layer for the hub tracker.
//!
//! Provides themes, the header component, the hub table and chart views, and
//! the application event loop built on [`ratatui`].

pub mod app;
pub mod chart_view;
pub mod components;
pub mod table_view;
pub mod themes;

pub use tracker_core as core;
