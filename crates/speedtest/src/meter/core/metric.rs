//! Throughput measurement value

use std::fmt;
use std::time::Duration;

use super::units::format_rate;

/// Amount of work observed over an interval
///
/// A `Metric` is produced twice per transfer: as provisional estimates while
/// the body is still streaming, and once as the exact result when the body
/// has been fully read. Per-transfer results are folded into one aggregate
/// with [`Metric::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metric {
    duration: Duration,
    bits: u64,
}

impl Metric {
    pub fn new(duration: Duration, bits: u64) -> Self {
        Self { duration, bits }
    }

    /// Build a metric from a byte count
    pub fn from_bytes(duration: Duration, bytes: u64) -> Self {
        Self::new(duration, bytes.saturating_mul(8))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Fold another metric into this one by summing duration and bits
    ///
    /// Summing durations is only a faithful wall-clock span while transfers
    /// never overlap.
    pub fn merge(&mut self, other: &Metric) -> &mut Self {
        self.duration = self.duration.saturating_add(other.duration);
        self.bits = self.bits.saturating_add(other.bits);
        self
    }

    /// Owned variant of [`Metric::merge`]
    pub fn merged(mut self, other: &Metric) -> Self {
        self.merge(other);
        self
    }

    /// Bits per second, or `0.0` when no time has elapsed
    pub fn rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.bits as f64 / secs
        }
    }

    /// Human readable rate, e.g. `"12.34 Mbps"`
    pub fn format(&self) -> String {
        format_rate(self.rate())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl std::iter::Sum for Metric {
    fn sum<I: Iterator<Item = Metric>>(iter: I) -> Self {
        iter.fold(Metric::default(), |acc, m| acc.merged(&m))
    }
}
