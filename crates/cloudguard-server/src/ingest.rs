//! Newline-delimited JSON sample ingestion.
//!
//! One sample per line:
//! `{"resource_id": "web-01", "metric": "cpu", "value": 85.0, "timestamp": "2024-01-01T00:00:00Z"}`.
//! `timestamp` is optional and defaults to the time the line is read.

use chrono::{DateTime, Utc};
use cloudguard_alert::MonitoringEngine;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SampleLine {
    pub resource_id: String,
    pub metric: String,
    pub value: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub alerts_triggered: usize,
}

/// `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<SampleLine>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Feeds every line of `reader` into the engine until EOF. Malformed lines
/// and rejected samples are logged and skipped.
pub async fn run_ingest<R>(engine: &MonitoringEngine, reader: R) -> std::io::Result<IngestSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = IngestSummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let sample = match parse_line(&line) {
            Ok(Some(sample)) => sample,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping malformed sample line");
                summary.rejected += 1;
                continue;
            }
        };

        let timestamp = sample.timestamp.unwrap_or_else(Utc::now);
        match engine.ingest(&sample.resource_id, &sample.metric, sample.value, timestamp) {
            Ok(alerts) => {
                summary.accepted += 1;
                summary.alerts_triggered += alerts.len();
            }
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Sample rejected");
                summary.rejected += 1;
            }
        }
    }

    tracing::info!(
        accepted = summary.accepted,
        rejected = summary.rejected,
        alerts = summary.alerts_triggered,
        "Ingestion input closed"
    );
    Ok(summary)
}
