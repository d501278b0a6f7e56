//! # Health Monitoring Module
//!
//! Classifies each incoming record against the static operating
//! envelopes and the rolling statistical detector, aggregates the
//! result into a single severity level, and appends every raised event
//! to the persisted mission log.
//!
//! The monitor is an ordinary telemetry sink: it runs on the
//! consumer-side dispatch task, so its rolling windows are only ever
//! touched from one task and need no locking.

pub mod anomaly;
pub mod thresholds;

use crate::config::MonitorConfig;
use crate::dispatch::TelemetrySink;
use crate::logstore::{EventLog, LogEntry, LogKind};
use crate::telemetry::TelemetryRecord;
use anomaly::{AnomalyDetector, TRACKED_CHANNELS};
use thresholds::evaluate_static;
use tokio::sync::watch;
use tracing::warn;

/// One classified monitoring event
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorEvent {
    /// Severity kind, mapped straight onto the log store
    pub kind: LogKind,
    /// Originating channel or subsystem tag
    pub location: String,
    /// Short human-readable message
    pub message: String,
    /// Long detail
    pub details: String,
    /// True for rolling-statistics ("ML") anomalies
    pub ml: bool,
}

/// Aggregate severity of one record, worst event wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeverityLevel {
    /// Everything within normal bounds
    Nominal = 0,
    /// At least one warning, error, or anomaly
    Degraded = 1,
    /// At least one critical event
    Critical = 2,
}

/// Severity level plus the reason of the worst event
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub level: SeverityLevel,
    /// Message of the highest-severity event, if any was raised
    pub reason: Option<String>,
}

impl HealthStatus {
    fn nominal() -> Self {
        Self {
            level: SeverityLevel::Nominal,
            reason: None,
        }
    }
}

/// Threshold & anomaly monitor over the record stream
pub struct HealthMonitor {
    detector: AnomalyDetector,
    sigma_factor: f64,
    log: Box<dyn EventLog>,
    status_tx: watch::Sender<HealthStatus>,
}

impl HealthMonitor {
    /// Create a monitor writing its events through the given log sink
    pub fn new(config: &MonitorConfig, log: Box<dyn EventLog>) -> Self {
        let (status_tx, _) = watch::channel(HealthStatus::nominal());
        Self {
            detector: AnomalyDetector::new(
                config.window_capacity,
                config.min_samples,
                config.sigma_factor,
            ),
            sigma_factor: config.sigma_factor,
            log,
            status_tx,
        }
    }

    /// Observe the aggregate severity for health-indicator consumers
    pub fn status(&self) -> watch::Receiver<HealthStatus> {
        self.status_tx.subscribe()
    }

    /// Classify one record; returns all raised events and the aggregate
    pub fn assess(&mut self, record: &TelemetryRecord) -> (Vec<MonitorEvent>, HealthStatus) {
        let mut events = evaluate_static(record);

        for channel in TRACKED_CHANNELS {
            let Some(value) = record.resolved(channel) else {
                continue;
            };
            if value.is_nan() {
                continue;
            }
            if let Some(check) = self.detector.observe(channel, value) {
                events.push(MonitorEvent {
                    kind: LogKind::Warning,
                    location: channel.to_string(),
                    message: format!(
                        "ML anomaly: {} value {:.3} deviates from mean {:.3} (σ={:.3})",
                        channel, value, check.mean, check.std_dev
                    ),
                    details: format!(
                        "{}={} deviates more than {}σ from rolling mean {:.3}",
                        channel, value, self.sigma_factor, check.mean
                    ),
                    ml: true,
                });
            }
        }

        let status = aggregate(&events);
        (events, status)
    }
}

/// Reduce raised events to a single severity level and reason
fn aggregate(events: &[MonitorEvent]) -> HealthStatus {
    let mut status = HealthStatus::nominal();
    for event in events {
        let level = match event.kind {
            LogKind::Critical => SeverityLevel::Critical,
            LogKind::Warning | LogKind::Error => SeverityLevel::Degraded,
            LogKind::Info => SeverityLevel::Nominal,
        };
        if level > status.level || (level == status.level && status.reason.is_none()) {
            if level > SeverityLevel::Nominal {
                status.reason = Some(event.message.clone());
            }
            status.level = level;
        }
    }
    status
}

impl TelemetrySink for HealthMonitor {
    fn name(&self) -> &str {
        "health-monitor"
    }

    fn on_record(&mut self, record: &TelemetryRecord) -> anyhow::Result<()> {
        let (events, status) = self.assess(record);

        for event in &events {
            let mut entry = LogEntry::new(
                event.kind,
                &event.location,
                &event.message,
                Some(&event.details),
            );
            if event.ml {
                entry.ml_flag = true;
                entry.ml_details = "Rolling statistics outlier".to_string();
            }
            // A full log disk must not halt ingestion
            if let Err(e) = self.log.append(&entry) {
                warn!("Failed to persist monitor event: {}", e);
            }
        }

        self.status_tx.send_replace(status);
        Ok(())
    }
}
