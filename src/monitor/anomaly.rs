//! # Rolling Statistical Anomaly Detection
//!
//! Per-channel rolling windows of recent values with a mean/σ outlier
//! test. A window must hold a minimum number of samples before the test
//! arms, and a zero-variance window never raises, so a constant signal
//! cannot produce false positives.

use std::collections::{HashMap, VecDeque};

/// Channels tracked by the rolling detector
pub const TRACKED_CHANNELS: [&str; 4] = ["bme_temp", "batt_v", "batt_i", "bme_p"];

/// Fixed-capacity window of the most recent values for one channel.
///
/// Lives for the process lifetime; never persisted.
#[derive(Debug)]
pub struct RollingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    /// Create an empty window holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Samples currently held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no samples have been recorded
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean of the held samples
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Standard deviation of the held samples
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = self
            .values
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / self.values.len() as f64;
        Some(variance.sqrt())
    }
}

/// Verdict for one flagged sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyCheck {
    /// Window mean at the time of the check
    pub mean: f64,
    /// Window standard deviation at the time of the check
    pub std_dev: f64,
}

/// Rolling outlier detector over the tracked channel set
#[derive(Debug)]
pub struct AnomalyDetector {
    windows: HashMap<String, RollingWindow>,
    capacity: usize,
    min_samples: usize,
    sigma_factor: f64,
}

impl AnomalyDetector {
    /// Create a detector with the given window shape and sensitivity
    pub fn new(capacity: usize, min_samples: usize, sigma_factor: f64) -> Self {
        Self {
            windows: HashMap::new(),
            capacity,
            min_samples,
            sigma_factor,
        }
    }

    /// Test one new sample against its channel's history, then absorb it.
    ///
    /// The verdict is computed over the window as it stood before this
    /// sample: a window short of `min_samples`, or one with zero
    /// variance, never flags. Otherwise the sample is an anomaly when
    /// it lies more than `sigma_factor` standard deviations from the
    /// window mean.
    pub fn observe(&mut self, channel: &str, value: f64) -> Option<AnomalyCheck> {
        let window = self
            .windows
            .entry(channel.to_string())
            .or_insert_with(|| RollingWindow::new(self.capacity));

        let verdict = match (window.mean(), window.std_dev()) {
            (Some(mean), Some(std_dev))
                if window.len() >= self.min_samples
                    && std_dev > 0.0
                    && (value - mean).abs() > self.sigma_factor * std_dev =>
            {
                Some(AnomalyCheck { mean, std_dev })
            }
            _ => None,
        };

        window.push(value);
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> AnomalyDetector {
        AnomalyDetector::new(20, 5, 2.5)
    }

    #[test]
    fn test_no_anomaly_below_min_samples() {
        let mut det = detector();
        for value in [1.0, 2.0, 1.5, 2.5] {
            assert!(det.observe("bme_temp", value).is_none());
        }
        // Fifth observation still checks a 4-sample window
        assert!(det.observe("bme_temp", 1_000_000.0).is_none());
    }

    #[test]
    fn test_zero_variance_never_raises() {
        let mut det = detector();
        for _ in 0..10 {
            det.observe("batt_v", 7.4);
        }
        assert!(det.observe("batt_v", 9999.0).is_none());
    }

    #[test]
    fn test_outlier_is_flagged_with_window_stats() {
        let mut det = detector();
        for value in [10.0, 10.5, 9.5, 10.2, 9.8, 10.1] {
            assert!(det.observe("bme_temp", value).is_none());
        }
        let check = det.observe("bme_temp", 50.0).expect("outlier should flag");
        assert!((check.mean - 10.016).abs() < 0.01);
        assert!(check.std_dev > 0.0);
    }

    #[test]
    fn test_inlier_is_not_flagged() {
        let mut det = detector();
        for value in [10.0, 10.5, 9.5, 10.2, 9.8, 10.1] {
            det.observe("bme_temp", value);
        }
        assert!(det.observe("bme_temp", 10.3).is_none());
    }

    #[test]
    fn test_channels_are_independent() {
        let mut det = detector();
        for value in [10.0, 10.5, 9.5, 10.2, 9.8] {
            det.observe("bme_temp", value);
        }
        // Same magnitude on a fresh channel: window too short to flag
        assert!(det.observe("batt_v", 50.0).is_none());
    }

    #[test]
    fn test_window_caps_at_capacity() {
        let mut window = RollingWindow::new(3);
        for value in [1.0, 2.0, 3.0, 4.0] {
            window.push(value);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.mean(), Some(3.0));
    }

    #[test]
    fn test_window_statistics() {
        let mut window = RollingWindow::new(10);
        for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            window.push(value);
        }
        assert_eq!(window.mean(), Some(5.0));
        assert_eq!(window.std_dev(), Some(2.0));
    }

    #[test]
    fn test_empty_window_has_no_statistics() {
        let window = RollingWindow::new(10);
        assert!(window.is_empty());
        assert_eq!(window.mean(), None);
        assert_eq!(window.std_dev(), None);
    }
}
