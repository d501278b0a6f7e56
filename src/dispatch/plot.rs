//! # Plot Buffer Sink
//!
//! Fixed-capacity recent-history buffer backing live plots. Keeps the
//! last N resolved samples per plotted channel, remembering whether
//! each sample came from the primary or the redundant sensor so the
//! plot layer can draw the fallback series separately.

use super::TelemetrySink;
use crate::telemetry::redundancy::{resolve, Source};
use crate::telemetry::{redundant_key, TelemetryRecord};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Channels plotted by default, matching the dashboard layout
pub const DEFAULT_PLOT_CHANNELS: [&str; 5] =
    ["bmp_alt", "bme_temp", "bme_p", "gps_vel", "batt_v"];

/// Samples retained per channel
pub const DEFAULT_PLOT_DEPTH: usize = 100;

/// One plotted sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotPoint {
    /// Resolved value
    pub value: f64,
    /// Which sensor supplied it
    pub source: Source,
}

#[derive(Debug, Default)]
struct Series {
    points: VecDeque<PlotPoint>,
}

/// Recent-history buffer shared between the dispatcher and a plot reader
pub struct PlotBuffer {
    channels: Vec<String>,
    depth: usize,
    series: Arc<Mutex<HashMap<String, Series>>>,
}

/// Read handle over a [`PlotBuffer`]'s series
#[derive(Clone)]
pub struct PlotReader {
    series: Arc<Mutex<HashMap<String, Series>>>,
}

impl PlotBuffer {
    /// Buffer over the default channel set
    pub fn new() -> Self {
        Self::with_channels(&DEFAULT_PLOT_CHANNELS, DEFAULT_PLOT_DEPTH)
    }

    /// Buffer over an explicit channel set and history depth
    pub fn with_channels(channels: &[&str], depth: usize) -> Self {
        Self {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            depth,
            series: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Shareable read handle for the plot layer
    pub fn reader(&self) -> PlotReader {
        PlotReader {
            series: Arc::clone(&self.series),
        }
    }
}

impl Default for PlotBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlotReader {
    /// Snapshot of the retained samples for one channel, oldest first
    pub fn snapshot(&self, channel: &str) -> Vec<PlotPoint> {
        self.series
            .lock()
            .unwrap()
            .get(channel)
            .map(|s| s.points.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl TelemetrySink for PlotBuffer {
    fn name(&self) -> &str {
        "plot-buffer"
    }

    fn on_record(&mut self, record: &TelemetryRecord) -> anyhow::Result<()> {
        let mut series = self.series.lock().unwrap();
        for channel in &self.channels {
            let resolution = resolve(
                record.get(channel),
                record.get(&redundant_key(channel)),
            );
            let Some(value) = resolution.value else {
                continue;
            };

            let entry = series.entry(channel.clone()).or_default();
            if entry.points.len() == self.depth {
                entry.points.pop_front();
            }
            entry.points.push_back(PlotPoint {
                value,
                source: resolution.source,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(channel: &str, value: f64) -> TelemetryRecord {
        let mut record = TelemetryRecord::new();
        record.insert(channel, value);
        record
    }

    #[test]
    fn test_samples_accumulate_oldest_first() {
        let mut buffer = PlotBuffer::with_channels(&["bmp_alt"], 10);
        let reader = buffer.reader();

        buffer.on_record(&record_with("bmp_alt", 100.0)).unwrap();
        buffer.on_record(&record_with("bmp_alt", 150.0)).unwrap();

        let points = reader.snapshot("bmp_alt");
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 100.0);
        assert_eq!(points[1].value, 150.0);
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut buffer = PlotBuffer::with_channels(&["bmp_alt"], 3);
        let reader = buffer.reader();

        for i in 0..5 {
            buffer.on_record(&record_with("bmp_alt", i as f64)).unwrap();
        }

        let points = reader.snapshot("bmp_alt");
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].value, 2.0);
        assert_eq!(points[2].value, 4.0);
    }

    #[test]
    fn test_redundant_samples_are_tagged() {
        let mut buffer = PlotBuffer::with_channels(&["bmp_alt"], 10);
        let reader = buffer.reader();

        let mut record = TelemetryRecord::new();
        record.insert("bmp_alt", 0.0);
        record.insert("bmp_alt_R", 980.0);
        buffer.on_record(&record).unwrap();

        let points = reader.snapshot("bmp_alt");
        assert_eq!(points[0].value, 980.0);
        assert_eq!(points[0].source, Source::Redundant);
    }

    #[test]
    fn test_absent_channel_adds_nothing() {
        let mut buffer = PlotBuffer::with_channels(&["bmp_alt"], 10);
        let reader = buffer.reader();

        buffer.on_record(&record_with("bme_temp", 20.0)).unwrap();

        assert!(reader.snapshot("bmp_alt").is_empty());
    }
}
