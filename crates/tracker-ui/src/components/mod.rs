//! Reusable dashboard widgets.

pub mod header;
