//! # Frame Field Parser
//!
//! Parses the lines of one completed frame into a flat [`TelemetryRecord`].
//!
//! Each line is classified by its sensor-family prefix (`Gyro:`, `BME:`,
//! `BMP:`, `GPS:`, and their redundant `(R)` counterparts) and numeric
//! tokens are extracted with permissive patterns. Lines that match no
//! family are ignored so newer firmware can add lines without breaking
//! older ground software; a sub-field that fails to match is omitted
//! from the record rather than raised as an error.

use crate::telemetry::{redundant_key, TelemetryRecord};
use regex::Regex;
use std::sync::LazyLock;

/// Permissive numeric literal: optional sign, digits, optional decimal point
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?\d*\.?\d+").expect("invalid number pattern"));

static BME_FIELDS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        tagged_number("T"),
        tagged_number("H"),
        tagged_number("P"),
    ]
});

static BMP_FIELDS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        tagged_number("T"),
        tagged_number("P"),
        tagged_number("Alt"),
    ]
});

static GPS_FIELDS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        tagged_number("Lat"),
        tagged_number("Lon"),
        tagged_number("Alt"),
        tagged_number("Vel"),
    ]
});

fn tagged_number(tag: &str) -> Regex {
    Regex::new(&format!(r"{}=([-+]?\d*\.?\d+)", tag)).expect("invalid field pattern")
}

/// Parse the ordered lines of one frame into a single flat record.
///
/// Multiple lines of the same family within one frame overwrite earlier
/// values (last write wins); the firmware resends a corrected line when
/// it detects a transmission fault.
///
/// # Arguments
///
/// * `lines` - The non-separator lines collected between two sentinels
///
/// # Examples
///
/// ```
/// use ground_link::frame::parser::parse_frame;
///
/// let lines = vec!["BME: T=21.5 H=40 P=1012.6".to_string()];
/// let record = parse_frame(&lines);
/// assert_eq!(record.get("bme_temp"), Some(21.5));
/// assert_eq!(record.get("bme_h"), Some(40.0));
/// ```
pub fn parse_frame(lines: &[String]) -> TelemetryRecord {
    let mut record = TelemetryRecord::new();
    for line in lines {
        parse_line(line.trim(), &mut record);
    }
    record
}

fn parse_line(line: &str, record: &mut TelemetryRecord) {
    if line.is_empty() {
        return;
    }

    if let Some(rest) = line.strip_prefix("Gyro:") {
        parse_gyro(rest, false, record);
    } else if let Some(rest) = line.strip_prefix("BME:") {
        parse_bme(rest, false, record);
    } else if let Some(rest) = line.strip_prefix("BMP:") {
        parse_bmp(rest, false, record);
    } else if let Some(rest) = line.strip_prefix("GPS:") {
        parse_gps(rest, false, record);
    } else if let Some(rest) = line.strip_prefix("Gyro(R):") {
        parse_gyro(rest, true, record);
    } else if let Some(rest) = line.strip_prefix("BME(R):") {
        parse_bme(rest, true, record);
    } else if let Some(rest) = line.strip_prefix("BMP(R):") {
        parse_bmp(rest, true, record);
    } else if let Some(rest) = line.strip_prefix("GPS(R):") {
        parse_gps(rest, true, record);
    }
    // Unrecognized family prefixes are ignored
}

fn channel(name: &str, redundant: bool) -> String {
    if redundant {
        redundant_key(name)
    } else {
        name.to_string()
    }
}

/// First three free numeric tokens, any separator
fn parse_gyro(rest: &str, redundant: bool, record: &mut TelemetryRecord) {
    let values: Vec<f64> = NUMBER
        .find_iter(rest)
        .take(3)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    if values.len() == 3 {
        record.insert(channel("gyro_x", redundant), values[0]);
        record.insert(channel("gyro_y", redundant), values[1]);
        record.insert(channel("gyro_z", redundant), values[2]);
    }
}

/// `T=` `H=` `P=`: all three required together or none captured
fn parse_bme(rest: &str, redundant: bool, record: &mut TelemetryRecord) {
    let fields = &*BME_FIELDS;
    if let (Some(t), Some(h), Some(p)) = (
        capture(&fields[0], rest),
        capture(&fields[1], rest),
        capture(&fields[2], rest),
    ) {
        record.insert(channel("bme_temp", redundant), t);
        record.insert(channel("bme_h", redundant), h);
        record.insert(channel("bme_p", redundant), p);
    }
}

/// `T=` `P=` `Alt=`: all three required together or none captured
fn parse_bmp(rest: &str, redundant: bool, record: &mut TelemetryRecord) {
    let fields = &*BMP_FIELDS;
    if let (Some(t), Some(p), Some(alt)) = (
        capture(&fields[0], rest),
        capture(&fields[1], rest),
        capture(&fields[2], rest),
    ) {
        record.insert(channel("bmp_temp", redundant), t);
        record.insert(channel("bmp_p", redundant), p);
        record.insert(channel("bmp_alt", redundant), alt);
    }
}

/// `Lat=` `Lon=` `Alt=` required together; `Vel=` captured independently
fn parse_gps(rest: &str, redundant: bool, record: &mut TelemetryRecord) {
    let fields = &*GPS_FIELDS;
    if let (Some(lat), Some(lon), Some(alt)) = (
        capture(&fields[0], rest),
        capture(&fields[1], rest),
        capture(&fields[2], rest),
    ) {
        record.insert(channel("gps_lat", redundant), lat);
        record.insert(channel("gps_lon", redundant), lon);
        record.insert(channel("gps_alt", redundant), alt);
    }
    if let Some(vel) = capture(&fields[3], rest) {
        record.insert(channel("gps_vel", redundant), vel);
    }
}

fn capture(pattern: &Regex, haystack: &str) -> Option<f64> {
    pattern
        .captures(haystack)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_gyro_line() {
        let record = parse_frame(&frame(&["Gyro: 0.12 -0.30 9.81"]));
        assert_eq!(record.get("gyro_x"), Some(0.12));
        assert_eq!(record.get("gyro_y"), Some(-0.30));
        assert_eq!(record.get("gyro_z"), Some(9.81));
    }

    #[test]
    fn test_parse_gyro_too_few_tokens_captures_nothing() {
        let record = parse_frame(&frame(&["Gyro: 0.12 -0.30"]));
        assert!(record.is_empty());
    }

    #[test]
    fn test_parse_bme_line() {
        let record = parse_frame(&frame(&["BME: T=21.5 H=40 P=1012.6"]));
        assert_eq!(record.get("bme_temp"), Some(21.5));
        assert_eq!(record.get("bme_h"), Some(40.0));
        assert_eq!(record.get("bme_p"), Some(1012.6));
    }

    #[test]
    fn test_parse_bme_all_or_nothing() {
        // Missing H= drops the whole family for this line
        let record = parse_frame(&frame(&["BME: T=21.5 P=1012.6"]));
        assert!(record.is_empty());
    }

    #[test]
    fn test_parse_bmp_line() {
        let record = parse_frame(&frame(&["BMP: T=20.9 P=1011.8 Alt=912.4"]));
        assert_eq!(record.get("bmp_temp"), Some(20.9));
        assert_eq!(record.get("bmp_p"), Some(1011.8));
        assert_eq!(record.get("bmp_alt"), Some(912.4));
    }

    #[test]
    fn test_parse_gps_with_velocity() {
        let record = parse_frame(&frame(&["GPS: Lat=12.9716 Lon=77.5946 Alt=890 Vel=42.5"]));
        assert_eq!(record.get("gps_lat"), Some(12.9716));
        assert_eq!(record.get("gps_lon"), Some(77.5946));
        assert_eq!(record.get("gps_alt"), Some(890.0));
        assert_eq!(record.get("gps_vel"), Some(42.5));
    }

    #[test]
    fn test_parse_gps_velocity_is_independent() {
        // Vel= is captured even when the Lat/Lon/Alt group is incomplete
        let record = parse_frame(&frame(&["GPS: Lat=12.9716 Vel=42.5"]));
        assert_eq!(record.get("gps_lat"), None);
        assert_eq!(record.get("gps_vel"), Some(42.5));
    }

    #[test]
    fn test_parse_redundant_lines() {
        let record = parse_frame(&frame(&[
            "BME: T=21.5 H=40 P=1012.6",
            "BME(R): T=21.1 H=41 P=1012.9",
        ]));
        assert_eq!(record.get("bme_temp"), Some(21.5));
        assert_eq!(record.get("bme_temp_R"), Some(21.1));
        assert_eq!(record.get("bme_h_R"), Some(41.0));
    }

    #[test]
    fn test_unrecognized_line_ignored() {
        let record = parse_frame(&frame(&["MAG: X=1 Y=2 Z=3", "booting sensor bus"]));
        assert!(record.is_empty());
    }

    #[test]
    fn test_last_write_wins_within_frame() {
        let record = parse_frame(&frame(&[
            "Gyro: 1 2 3",
            "Gyro: 4 5 6",
        ]));
        assert_eq!(record.get("gyro_x"), Some(4.0));
        assert_eq!(record.get("gyro_z"), Some(6.0));
    }

    #[test]
    fn test_numeric_round_trip() {
        for value in [0.0, -12.75, 1013.25, 0.001, -0.5] {
            let line = format!("BMP: T={} P={} Alt={}", value, value, value);
            let record = parse_frame(&frame(&[&line]));
            let parsed = record.get("bmp_alt").unwrap();
            assert!((parsed - value).abs() < 1e-9, "expected {}, got {}", value, parsed);
        }
    }

    #[test]
    fn test_signed_and_bare_decimal_tokens() {
        let record = parse_frame(&frame(&["GPS: Lat=-33.8688 Lon=+151.2093 Alt=.5"]));
        assert_eq!(record.get("gps_lat"), Some(-33.8688));
        assert_eq!(record.get("gps_lon"), Some(151.2093));
        assert_eq!(record.get("gps_alt"), Some(0.5));
    }
}
