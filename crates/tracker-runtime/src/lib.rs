//! Runtime layer for the hub tracker.
//!
//! Owns the cached sheet reads and the background refresh loop that feeds
//! dashboard snapshots to the UI.

pub mod data_manager;
pub mod orchestrator;

pub use tracker_core as core;
pub use tracker_data as data;
