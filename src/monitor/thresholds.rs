//! # Static Range Checks
//!
//! Fixed per-channel operating envelopes. The table is process-wide,
//! read-only configuration; values beyond the normal bounds raise a
//! warning, values beyond the critical bounds raise a critical event.

use super::MonitorEvent;
use crate::logstore::LogKind;
use crate::telemetry::TelemetryRecord;

/// Operating envelope for one monitored channel
#[derive(Debug, Clone, Copy)]
pub struct ChannelThresholds {
    /// Record channel the envelope applies to
    pub channel: &'static str,
    /// Human-readable quantity name used in event messages
    pub label: &'static str,
    /// Display unit
    pub unit: &'static str,
    /// Normal operating range
    pub min: f64,
    pub max: f64,
    /// Range beyond which the reading is mission-critical
    pub critical_min: f64,
    pub critical_max: f64,
}

/// Static envelope table for scalar channels
pub const THRESHOLD_TABLE: [ChannelThresholds; 6] = [
    ChannelThresholds {
        channel: "bme_temp",
        label: "Temperature",
        unit: "°C",
        min: -20.0,
        max: 60.0,
        critical_min: -40.0,
        critical_max: 100.0,
    },
    ChannelThresholds {
        channel: "bme_h",
        label: "Humidity",
        unit: "%",
        min: 15.0,
        max: 95.0,
        critical_min: 5.0,
        critical_max: 99.0,
    },
    ChannelThresholds {
        channel: "bme_p",
        label: "Pressure",
        unit: "hPa",
        min: 850.0,
        max: 1085.0,
        critical_min: 300.0,
        critical_max: 1100.0,
    },
    ChannelThresholds {
        channel: "batt_v",
        label: "Battery voltage",
        unit: "V",
        min: 6.6,
        max: 8.4,
        critical_min: 6.0,
        critical_max: 8.7,
    },
    ChannelThresholds {
        channel: "batt_i",
        label: "Battery current",
        unit: "A",
        min: 0.05,
        max: 4.0,
        critical_min: -0.5,
        critical_max: 6.0,
    },
    ChannelThresholds {
        channel: "bmp_alt",
        label: "Altitude",
        unit: "m",
        min: -50.0,
        max: 3500.0,
        critical_min: -200.0,
        critical_max: 5000.0,
    },
];

/// Acceleration axes checked as a Euclidean magnitude
pub const ACCEL_AXES: [&str; 3] = ["accel_x", "accel_y", "accel_z"];

/// Normal and critical bounds on acceleration magnitude (m/s²)
pub const ACCEL_MAX: f64 = 40.0;
pub const ACCEL_CRITICAL_MAX: f64 = 120.0;

/// Run every static check against one record.
///
/// Per channel the most severe classification wins: beyond the critical
/// bound is critical, beyond the normal bound is a warning, inside the
/// normal range raises nothing. Channels absent from the record are
/// skipped. Two additional checks cover the whole record: a NaN scan
/// over every present field, and a GPS-fix-presence check that reports
/// an informational "searching for fix" while no fix has come through.
pub fn evaluate_static(record: &TelemetryRecord) -> Vec<MonitorEvent> {
    let mut events = Vec::new();

    for entry in &THRESHOLD_TABLE {
        let Some(value) = record.resolved(entry.channel) else {
            continue;
        };
        if value.is_nan() {
            // Handled by the NaN scan below
            continue;
        }
        if let Some(event) = classify(entry, value) {
            events.push(event);
        }
    }

    if let Some(event) = check_acceleration(record) {
        events.push(event);
    }

    if record.resolved("gps_lat").is_none() && record.resolved("gps_lon").is_none() {
        events.push(MonitorEvent {
            kind: LogKind::Info,
            location: "gps".to_string(),
            message: "Searching for GPS fix".to_string(),
            details: "No position channels in frame".to_string(),
            ml: false,
        });
    }

    // Generic NaN scan over all present fields
    for (channel, value) in record.channels() {
        if value.is_nan() {
            events.push(MonitorEvent {
                kind: LogKind::Warning,
                location: channel.to_string(),
                message: format!("{} reported nan", channel),
                details: "Sensor produced a non-numeric reading".to_string(),
                ml: false,
            });
        }
    }

    events
}

fn classify(entry: &ChannelThresholds, value: f64) -> Option<MonitorEvent> {
    if value < entry.critical_min || value > entry.critical_max {
        return Some(MonitorEvent {
            kind: LogKind::Critical,
            location: entry.channel.to_string(),
            message: format!(
                "{} {}{} beyond critical range",
                entry.label, value, entry.unit
            ),
            details: format!(
                "{}={} outside critical bounds [{}, {}] {}",
                entry.channel, value, entry.critical_min, entry.critical_max, entry.unit
            ),
            ml: false,
        });
    }
    if value < entry.min || value > entry.max {
        return Some(MonitorEvent {
            kind: LogKind::Warning,
            location: entry.channel.to_string(),
            message: format!(
                "{} {}{} outside normal range",
                entry.label, value, entry.unit
            ),
            details: format!(
                "{}={} outside normal bounds [{}, {}] {}",
                entry.channel, value, entry.min, entry.max, entry.unit
            ),
            ml: false,
        });
    }
    None
}

fn check_acceleration(record: &TelemetryRecord) -> Option<MonitorEvent> {
    let mut squares = 0.0;
    for axis in ACCEL_AXES {
        let value = record.resolved(axis)?;
        if value.is_nan() {
            return None;
        }
        squares += value * value;
    }
    let magnitude = squares.sqrt();

    if magnitude > ACCEL_CRITICAL_MAX {
        return Some(MonitorEvent {
            kind: LogKind::Critical,
            location: "accel".to_string(),
            message: format!("Acceleration {:.1}m/s² beyond critical limit", magnitude),
            details: format!(
                "|accel|={:.2} exceeds critical limit {}",
                magnitude, ACCEL_CRITICAL_MAX
            ),
            ml: false,
        });
    }
    if magnitude > ACCEL_MAX {
        return Some(MonitorEvent {
            kind: LogKind::Warning,
            location: "accel".to_string(),
            message: format!("Acceleration {:.1}m/s² above normal limit", magnitude),
            details: format!("|accel|={:.2} exceeds limit {}", magnitude, ACCEL_MAX),
            ml: false,
        });
    }
    None
}
