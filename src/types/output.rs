//! Output structures for terminal display

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::types::{ReasonCode, SessionStatus};

/// Output structure for each tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickOutput {
    /// Wall-clock timestamp of the tick
    pub timestamp: DateTime<Utc>,
    /// Simulated time since start (milliseconds)
    pub elapsed_ms: u64,
    /// Current temperature
    pub value: f64,
    /// Sweet spot lower bound
    pub target_min: f64,
    /// Sweet spot upper bound
    pub target_max: f64,
    /// Is the value inside the sweet spot?
    pub in_window: bool,
    /// Status after the tick
    pub status: SessionStatus,
    /// Current out-of-window streak (milliseconds)
    pub consecutive_bad_ms: u64,
    /// Did the sweet spot move this tick?
    pub shifted: bool,
    /// Most significant reason for this tick
    pub reason: ReasonCode,
}

impl TickOutput {
    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let line = format!(
            "{} t={:.1}s | temp={:.0}% | spot={:.0}-{:.0}% | out={:.1}s | {}",
            self.status.emoji(),
            self.elapsed_ms as f64 / 1000.0,
            self.value,
            self.target_min,
            self.target_max,
            self.consecutive_bad_ms as f64 / 1000.0,
            self.reason.code()
        );
        match (self.status, self.in_window) {
            (SessionStatus::Failed, _) => line.red().bold().to_string(),
            (SessionStatus::Succeeded, _) => line.green().bold().to_string(),
            (_, true) => line.green().to_string(),
            (_, false) if self.reason == ReasonCode::S004_FAILURE_WARNING => {
                line.yellow().to_string()
            }
            (_, false) => line.red().to_string(),
        }
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "t={:.1}s | temp={:.0} | spot={:.0}-{:.0} | status={} | out={:.1}s | reason={}",
            self.elapsed_ms as f64 / 1000.0,
            self.value,
            self.target_min,
            self.target_max,
            self.status,
            self.consecutive_bad_ms as f64 / 1000.0,
            self.reason.code()
        )
    }
}
