//! Delayed feedback: the in/out signal as seen through a lagging sensor

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::Session;

/// Latched feedback for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedbackSignal {
    /// Lagged in-window flag
    pub in_window: bool,
    /// False during warm-up, before the first delay has passed
    pub available: bool,
}

/// Feedback engine
#[derive(Debug, Clone)]
pub struct FeedbackEngine {
    delay: Duration,
    last: FeedbackSignal,
}

impl FeedbackEngine {
    /// Create engine with the given sensor lag
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: FeedbackSignal::default(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// In/out flag of the first sample at or after `elapsed - delay`.
    /// False while `elapsed < delay` or when no such sample exists.
    pub fn delayed_feedback<R>(&self, session: &Session<R>) -> bool {
        let Some(target) = session.elapsed().checked_sub(self.delay) else {
            return false;
        };
        session
            .history()
            .first_at_or_after(target)
            .map(|sample| sample.in_window)
            .unwrap_or(false)
    }

    pub fn is_available<R>(&self, session: &Session<R>) -> bool {
        session.elapsed() >= self.delay
    }

    /// Recompute and latch the signal; call once per tick
    pub fn update<R>(&mut self, session: &Session<R>) -> FeedbackSignal {
        self.last = FeedbackSignal {
            in_window: self.delayed_feedback(session),
            available: self.is_available(session),
        };
        self.last
    }

    /// Last latched signal
    pub fn current(&self) -> FeedbackSignal {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = FeedbackSignal::default();
    }
}

impl Default for FeedbackEngine {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::FEEDBACK_DELAY_MS))
    }
}

// =============================================================================
// TESTS
// =============================================================================
