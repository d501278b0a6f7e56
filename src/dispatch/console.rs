//! # Console Panel Sink
//!
//! Terminal stand-in for the ground-station side panel: connection
//! status, packet count, and the headline flight values with redundant
//! fallback applied.

use super::TelemetrySink;
use crate::telemetry::TelemetryRecord;
use tracing::info;

/// Flight values shown on every record, in display order
const FLIGHT_CHANNELS: [(&str, &str); 4] = [
    ("ALTITUDE", "bmp_alt"),
    ("TEMPERATURE", "bme_temp"),
    ("PRESSURE", "bme_p"),
    ("VELOCITY", "gps_vel"),
];

/// Logs connection state and headline values for each record
#[derive(Debug, Default)]
pub struct ConsolePanel {
    packets: u64,
}

impl ConsolePanel {
    /// Create a panel with a zeroed packet counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets received since construction
    pub fn packet_count(&self) -> u64 {
        self.packets
    }

    fn format_value(record: &TelemetryRecord, channel: &str) -> String {
        match record.resolved(channel) {
            Some(value) => format!("{:.2}", value),
            None => "-".to_string(),
        }
    }
}

impl TelemetrySink for ConsolePanel {
    fn name(&self) -> &str {
        "console-panel"
    }

    fn on_connected(&mut self, port: &str) {
        info!("CONNECTED on {}", port);
    }

    fn on_connection_lost(&mut self, reason: &str) {
        info!("DISCONNECTED ({})", reason);
    }

    fn on_record(&mut self, record: &TelemetryRecord) -> anyhow::Result<()> {
        self.packets += 1;

        let values: Vec<String> = FLIGHT_CHANNELS
            .iter()
            .map(|(label, channel)| format!("{}={}", label, Self::format_value(record, channel)))
            .collect();

        info!("packet #{} | {}", self.packets, values.join(" "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_count_increments() {
        let mut panel = ConsolePanel::new();
        let mut record = TelemetryRecord::new();
        record.insert("bmp_alt", 1200.0);

        panel.on_record(&record).unwrap();
        panel.on_record(&record).unwrap();

        assert_eq!(panel.packet_count(), 2);
    }

    #[test]
    fn test_missing_value_renders_dash() {
        let record = TelemetryRecord::new();
        assert_eq!(ConsolePanel::format_value(&record, "bmp_alt"), "-");
    }

    #[test]
    fn test_redundant_fallback_in_display() {
        let mut record = TelemetryRecord::new();
        record.insert("bmp_alt", 0.0);
        record.insert("bmp_alt_R", 1180.5);
        assert_eq!(ConsolePanel::format_value(&record, "bmp_alt"), "1180.50");
    }
}
