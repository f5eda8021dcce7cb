//! In/out history for delayed feedback
//!
//! - Sample = one tick's membership flag at a simulated timestamp
//! - Window = trailing retention period (10 seconds by default)

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One recorded tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Simulated time since session start
    #[serde(with = "duration_ms")]
    pub at: Duration,
    /// Was the value inside the sweet spot?
    pub in_window: bool,
}

/// History window - samples pruned to a trailing retention period
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    samples: VecDeque<Sample>,
    retention: Duration,
}

impl HistoryWindow {
    /// Create empty history with the given retention
    pub fn new(retention: Duration) -> Self {
        Self {
            samples: VecDeque::new(),
            retention,
        }
    }

    /// Append a sample taken at `at` and drop everything older than
    /// `at - retention`
    pub fn record(&mut self, at: Duration, in_window: bool) {
        // Timestamps come from a monotonic clock; never let one run backwards.
        let at = match self.samples.back() {
            Some(last) if last.at > at => last.at,
            _ => at,
        };
        self.samples.push_back(Sample { at, in_window });
        self.prune(at);
    }

    /// Remove samples older than `now - retention`
    fn prune(&mut self, now: Duration) {
        let Some(cutoff) = now.checked_sub(self.retention) else {
            return;
        };
        while let Some(front) = self.samples.front() {
            if front.at < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// First sample (oldest first) taken at or after `at`
    pub fn first_at_or_after(&self, at: Duration) -> Option<&Sample> {
        self.samples.iter().find(|s| s.at >= at)
    }

    /// Get all samples (oldest first)
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Share of retained samples spent inside the window (0.0 when empty)
    pub fn in_window_ratio(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let good = self.samples.iter().filter(|s| s.in_window).count();
        good as f64 / self.samples.len() as f64
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Serialize `Duration` as integer milliseconds
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

// =============================================================================
// TESTS
// =============================================================================
