//! # CSV Replay Source
//!
//! Replays a wide-table mission CSV through the same record pipeline
//! the live link feeds, so every consumer (panel, plots, monitor)
//! behaves identically on recorded data.
//!
//! Each CSV row becomes one [`TelemetryRecord`]: headers are channel
//! names, empty or non-numeric cells are absent channels (never zero),
//! and a literal `nan` cell becomes a NaN reading for the monitor's
//! NaN scan to flag. Redundant columns may be marked either with the
//! wire-style `_R` suffix or a `REDUNDANT` suffix, which is normalized
//! to `_R`.

use crate::config::ReplayConfig;
use crate::error::{GroundLinkError, Result};
use crate::ingest::WorkerEvent;
use crate::telemetry::{TelemetryRecord, REDUNDANT_SUFFIX};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Replays one mission CSV at a fixed pace
pub struct CsvReplaySource {
    path: PathBuf,
    interval: Duration,
}

impl CsvReplaySource {
    /// Create a replay source from its configuration section
    pub fn new(config: &ReplayConfig) -> Self {
        Self {
            path: PathBuf::from(&config.path),
            interval: Duration::from_millis(config.interval_ms),
        }
    }

    /// Parse the whole file into records, skipping rows with no
    /// recognizable numeric cell
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or a row is malformed
    pub fn load_records(&self) -> Result<Vec<TelemetryRecord>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| GroundLinkError::Replay(format!("Failed to open {}: {}", self.path.display(), e)))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| GroundLinkError::Replay(e.to_string()))?
            .iter()
            .map(normalize_header)
            .collect();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| GroundLinkError::Replay(e.to_string()))?;
            let record = record_from_row(&headers, &row);
            if record.is_empty() {
                debug!("Skipping replay row with no numeric cells");
                continue;
            }
            records.push(record);
        }
        Ok(records)
    }

    /// Emit the file through the worker event queue at the configured
    /// pace, mirroring the live link's event shape.
    ///
    /// A file that cannot be read produces a single
    /// `ConnectionLost("OPEN FAIL: …")`, exactly like a port that
    /// cannot be opened; a completed replay ends with
    /// `ConnectionLost("REPLAY COMPLETE")`.
    pub async fn run(self, events: mpsc::Sender<WorkerEvent>) {
        let records = match self.load_records() {
            Ok(records) => records,
            Err(e) => {
                warn!("Replay failed: {}", e);
                let _ = events
                    .send(WorkerEvent::ConnectionLost(format!("OPEN FAIL: {}", e)))
                    .await;
                return;
            }
        };

        info!(
            "Replaying {} records from {}",
            records.len(),
            self.path.display()
        );
        let _ = events
            .send(WorkerEvent::Connected(self.path.display().to_string()))
            .await;

        for record in records {
            if events.send(WorkerEvent::Record(record)).await.is_err() {
                return;
            }
            if !self.interval.is_zero() {
                sleep(self.interval).await;
            }
        }

        let _ = events
            .send(WorkerEvent::ConnectionLost("REPLAY COMPLETE".to_string()))
            .await;
    }
}

/// Map a CSV header to its channel name, folding the `REDUNDANT`
/// marker into the wire-style `_R` suffix
fn normalize_header(header: &str) -> String {
    let header = header.trim();
    if let Some(base) = header.strip_suffix("REDUNDANT") {
        format!("{}{}", base.trim_end_matches('_'), REDUNDANT_SUFFIX)
    } else {
        header.to_string()
    }
}

fn record_from_row(headers: &[String], row: &csv::StringRecord) -> TelemetryRecord {
    let mut record = TelemetryRecord::new();
    for (header, cell) in headers.iter().zip(row.iter()) {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        // "nan" parses to f64::NAN and is kept for the monitor to flag
        if let Ok(value) = cell.parse::<f64>() {
            record.insert(header.clone(), value);
        }
    }
    record
}
