//! Capture summaries: per-player statistics and the JSON report.

pub mod export;
pub mod statistics;

pub use export::{export_to_json, CaptureReport};
