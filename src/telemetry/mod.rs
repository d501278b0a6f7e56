//! # Telemetry Data Model
//!
//! Structured telemetry records produced by the ingestion pipeline.
//!
//! This module handles:
//! - The flat channel-name -> value record type
//! - The primary/redundant channel naming convention
//! - Redundancy-aware channel reads

pub mod redundancy;

use std::collections::BTreeMap;

/// Suffix marking a channel as the redundant (fallback) reading
/// of its primary counterpart (e.g. `bme_temp_R` for `bme_temp`).
pub const REDUNDANT_SUFFIX: &str = "_R";

/// Gyroscope channels (3-axis, deg/s)
pub const GYRO_CHANNELS: [&str; 3] = ["gyro_x", "gyro_y", "gyro_z"];

/// BME environmental channels (temperature, humidity, pressure)
pub const BME_CHANNELS: [&str; 3] = ["bme_temp", "bme_h", "bme_p"];

/// BMP barometric channels (temperature, pressure, altitude)
pub const BMP_CHANNELS: [&str; 3] = ["bmp_temp", "bmp_p", "bmp_alt"];

/// GPS channels (latitude, longitude, altitude, velocity)
pub const GPS_CHANNELS: [&str; 4] = ["gps_lat", "gps_lon", "gps_alt", "gps_vel"];

/// Returns the redundant counterpart key for a primary channel name
///
/// # Examples
///
/// ```
/// use ground_link::telemetry::redundant_key;
///
/// assert_eq!(redundant_key("bme_temp"), "bme_temp_R");
/// ```
pub fn redundant_key(primary: &str) -> String {
    format!("{}{}", primary, REDUNDANT_SUFFIX)
}

/// One structured telemetry record: a flat mapping from channel name
/// to numeric value, covering exactly one completed frame.
///
/// A channel that was not parsed is absent from the map. Absence means
/// "unknown", never zero; zero is a valid reading and is stored as such.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryRecord {
    channels: BTreeMap<String, f64>,
}

impl TelemetryRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a channel value (last write wins)
    pub fn insert(&mut self, channel: impl Into<String>, value: f64) {
        self.channels.insert(channel.into(), value);
    }

    /// Read a channel value; `None` if the channel is absent
    pub fn get(&self, channel: &str) -> Option<f64> {
        self.channels.get(channel).copied()
    }

    /// True if no channel was parsed into this record
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of channels present
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Iterate over all (channel, value) pairs in name order
    pub fn channels(&self) -> impl Iterator<Item = (&str, f64)> {
        self.channels.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Redundancy-aware read: the authoritative value for a logical
    /// channel, falling back to its `_R` counterpart per the resolver
    /// policy (primary absent, NaN, or zero).
    ///
    /// # Examples
    ///
    /// ```
    /// use ground_link::telemetry::TelemetryRecord;
    ///
    /// let mut record = TelemetryRecord::new();
    /// record.insert("bme_temp", 0.0);
    /// record.insert("bme_temp_R", 21.5);
    /// assert_eq!(record.resolved("bme_temp"), Some(21.5));
    /// ```
    pub fn resolved(&self, channel: &str) -> Option<f64> {
        let resolution = redundancy::resolve(
            self.get(channel),
            self.get(&redundant_key(channel)),
        );
        resolution.value
    }
}

impl FromIterator<(String, f64)> for TelemetryRecord {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self {
            channels: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_channel_is_none_not_zero() {
        let record = TelemetryRecord::new();
        assert!(record.is_empty());
        assert_eq!(record.get("bme_temp"), None);
    }

    #[test]
    fn test_zero_is_a_stored_value() {
        let mut record = TelemetryRecord::new();
        record.insert("gyro_x", 0.0);
        assert!(!record.is_empty());
        assert_eq!(record.get("gyro_x"), Some(0.0));
    }

    #[test]
    fn test_insert_overwrites() {
        // Firmware may resend a corrected line within one frame
        let mut record = TelemetryRecord::new();
        record.insert("bme_temp", 20.0);
        record.insert("bme_temp", 21.0);
        assert_eq!(record.get("bme_temp"), Some(21.0));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_redundant_key_convention() {
        assert_eq!(redundant_key("gps_lat"), "gps_lat_R");
    }

    #[test]
    fn test_resolved_prefers_primary() {
        let mut record = TelemetryRecord::new();
        record.insert("bmp_alt", 1200.0);
        record.insert("bmp_alt_R", 1180.0);
        assert_eq!(record.resolved("bmp_alt"), Some(1200.0));
    }

    #[test]
    fn test_resolved_falls_back_when_primary_missing() {
        let mut record = TelemetryRecord::new();
        record.insert("bmp_alt_R", 1180.0);
        assert_eq!(record.resolved("bmp_alt"), Some(1180.0));
    }
}
