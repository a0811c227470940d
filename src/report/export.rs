//! JSON export of a capture: every hand record plus the statistics.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::statistics::ReportStats;
use crate::reconcile::{HandRecord, PlayerRecord};

#[derive(Debug, Serialize)]
pub struct CaptureReport<'a> {
    pub generated_at: DateTime<Local>,
    pub statistics: ReportStats,
    pub players: Vec<&'a PlayerRecord>,
    pub hands: &'a [HandRecord],
}

impl<'a> CaptureReport<'a> {
    pub fn new(hands: &'a [HandRecord], players: impl IntoIterator<Item = &'a PlayerRecord>) -> Self {
        Self {
            generated_at: Local::now(),
            statistics: ReportStats::from_records(hands),
            players: players.into_iter().collect(),
            hands,
        }
    }
}

/// Export the report to a JSON file.
///
/// The output is pretty-printed for human readability.
pub fn export_to_json(report: &CaptureReport<'_>, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;

    let mut file = File::create(output_path)
        .context(format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    Ok(())
}
