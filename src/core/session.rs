//! Session engine: sweet spot state machine driven by fixed ticks
//!
//! State transitions:
//! - NOT_STARTED → RUNNING: start()
//! - RUNNING → FAILED: consecutive time outside the window reaches the limit
//! - RUNNING → SUCCEEDED: elapsed reaches the session length
//! - any → NOT_STARTED: reset()
//!
//! Time only moves through `tick(dt)`; randomness comes from the injected
//! generator, so a seeded session replays exactly.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{
    Direction, GameConfig, HistoryWindow, ReasonCode, SessionStatus, TickOutput,
};
use crate::types::ordered;
use crate::FAILURE_REASON_TOO_LONG_OUTSIDE;

/// Final result of a session, handed to the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub score: u32,
    pub failed: bool,
    pub reason: Option<String>,
}

/// Sweet spot session
#[derive(Debug)]
pub struct Session<R = StdRng> {
    config: GameConfig,
    rng: R,
    /// Current temperature
    value: f64,
    target_center: f64,
    target_min: f64,
    target_max: f64,
    /// Simulated time since start
    elapsed: Duration,
    good_time: Duration,
    bad_time: Duration,
    /// Current streak outside the window
    consecutive_bad_time: Duration,
    /// Wait until the next relocation, measured from `last_shift_at`
    next_shift_in: Duration,
    last_shift_at: Duration,
    history: HistoryWindow,
    status: SessionStatus,
    failure_reason: Option<String>,
}

impl Session<StdRng> {
    /// Deterministic session for tests and replays
    pub fn seeded(config: GameConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    /// Session seeded from OS entropy
    pub fn from_entropy(config: GameConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> Session<R> {
    /// Create a session in NOT_STARTED with the given random source.
    ///
    /// The config is expected to pass [`GameConfig::validate`]; drivers check
    /// it before building sessions. Inverted interval or shift bounds and a
    /// window wider than the range are tolerated rather than panicking.
    pub fn with_rng(config: GameConfig, rng: R) -> Self {
        let center = config.clamp_center(config.window_start_center);
        let half = config.window_size / 2.0;
        let history = HistoryWindow::new(config.history_retention());
        let mut session = Self {
            value: config.value_min,
            target_center: center,
            target_min: center - half,
            target_max: center + half,
            elapsed: Duration::ZERO,
            good_time: Duration::ZERO,
            bad_time: Duration::ZERO,
            consecutive_bad_time: Duration::ZERO,
            next_shift_in: Duration::ZERO,
            last_shift_at: Duration::ZERO,
            history,
            status: SessionStatus::NotStarted,
            failure_reason: None,
            config,
            rng,
        };
        session.value = session.draw_value();
        session.next_shift_in = session.draw_shift_interval();
        session
    }

    /// Begin a new run: fresh value, window at its start center, counters zeroed
    pub fn start(&mut self) {
        self.clear_run();
        self.status = SessionStatus::Running;
        info!(
            value = self.value,
            target_min = self.target_min,
            target_max = self.target_max,
            next_shift_ms = self.next_shift_in.as_millis() as u64,
            "Session started"
        );
    }

    /// Back to NOT_STARTED with a fresh value
    pub fn reset(&mut self) {
        self.clear_run();
        self.status = SessionStatus::NotStarted;
        debug!("Session reset");
    }

    fn clear_run(&mut self) {
        self.value = self.draw_value();
        self.set_center(self.config.window_start_center);
        self.elapsed = Duration::ZERO;
        self.good_time = Duration::ZERO;
        self.bad_time = Duration::ZERO;
        self.consecutive_bad_time = Duration::ZERO;
        self.last_shift_at = Duration::ZERO;
        self.next_shift_in = self.draw_shift_interval();
        self.history.clear();
        self.failure_reason = None;
    }

    /// Move the value one increment; returns false when not running
    pub fn adjust(&mut self, direction: Direction) -> bool {
        if self.status != SessionStatus::Running || self.is_over() {
            return false;
        }
        let change = direction.sign() * self.config.increment;
        self.value = self.config.clamp_value(self.value + change);
        true
    }

    /// Advance simulated time by `dt` and update window, scoring and history
    pub fn tick(&mut self, dt: Duration) -> TickOutput {
        match self.status {
            SessionStatus::NotStarted => {
                return self.output(false, ReasonCode::S002_STATE_NOT_STARTED)
            }
            SessionStatus::Succeeded | SessionStatus::Failed => {
                return self.output(false, ReasonCode::S002_STATE_OVER)
            }
            SessionStatus::Running => {}
        }

        let length = self.config.session_length();
        if self.elapsed >= length {
            self.status = SessionStatus::Succeeded;
            return self.output(false, ReasonCode::S005_TRANSITION_TO_SUCCEEDED);
        }

        // Scoring never runs past the session end
        let step = dt.min(length - self.elapsed);
        self.elapsed += step;

        let shifted = self.maybe_shift();

        let in_window = self.is_in_window();
        let mut reason = if in_window {
            self.good_time += step;
            self.consecutive_bad_time = Duration::ZERO;
            ReasonCode::S001_IN_WINDOW
        } else {
            self.bad_time += step;
            self.consecutive_bad_time += step;
            if self.consecutive_bad_time >= self.config.max_failure() {
                self.status = SessionStatus::Failed;
                self.failure_reason = Some(FAILURE_REASON_TOO_LONG_OUTSIDE.to_string());
                info!(
                    elapsed_ms = self.elapsed.as_millis() as u64,
                    score = self.quality_score(),
                    "Session failed: too long outside sweet spot"
                );
                ReasonCode::S005_TRANSITION_TO_FAILED
            } else if self.consecutive_bad_time >= self.config.warning() {
                debug!(
                    outside_ms = self.consecutive_bad_time.as_millis() as u64,
                    limit_ms = self.config.max_failure_ms,
                    "Failure warning"
                );
                ReasonCode::S004_FAILURE_WARNING
            } else {
                ReasonCode::S001_OUT_OF_WINDOW
            }
        };

        self.history.record(self.elapsed, in_window);

        if self.status == SessionStatus::Running && self.elapsed >= length {
            self.status = SessionStatus::Succeeded;
            info!(score = self.quality_score(), "Session complete");
            reason = ReasonCode::S005_TRANSITION_TO_SUCCEEDED;
        } else if shifted && matches!(reason, ReasonCode::S001_IN_WINDOW | ReasonCode::S001_OUT_OF_WINDOW) {
            reason = ReasonCode::S003_WINDOW_SHIFTED;
        }

        self.output(shifted, reason)
    }

    /// Relocate the window if its interval has run out
    fn maybe_shift(&mut self) -> bool {
        if self.elapsed.saturating_sub(self.last_shift_at) < self.next_shift_in {
            return false;
        }
        let delta = self.draw_shift_delta();
        self.set_center(self.target_center + delta);
        self.last_shift_at = self.elapsed;
        self.next_shift_in = self.draw_shift_interval();
        debug!(
            target_min = self.target_min,
            target_max = self.target_max,
            next_shift_ms = self.next_shift_in.as_millis() as u64,
            "Sweet spot moved"
        );
        true
    }

    fn set_center(&mut self, center: f64) {
        let half = self.config.window_size / 2.0;
        self.target_center = self.config.clamp_center(center);
        self.target_min = self.target_center - half;
        self.target_max = self.target_center + half;
    }

    /// Whole-degree starting value, uniform over [min, max]
    fn draw_value(&mut self) -> f64 {
        let lo = self.config.value_min.ceil();
        let hi = self.config.value_max.floor();
        if lo <= hi {
            self.rng.gen_range(lo as i64..=hi as i64) as f64
        } else {
            // No whole degree in range
            let (lo, hi) = ordered(self.config.value_min, self.config.value_max);
            if lo.is_finite() && hi.is_finite() {
                self.rng.gen_range(lo..=hi)
            } else {
                self.config.clamp_value(self.config.window_start_center)
            }
        }
    }

    fn draw_shift_interval(&mut self) -> Duration {
        let (lo, hi) = ordered(
            self.config.shift_interval_min_ms,
            self.config.shift_interval_max_ms,
        );
        Duration::from_millis(self.rng.gen_range(lo..=hi))
    }

    fn draw_shift_delta(&mut self) -> f64 {
        let (lo, hi) = ordered(self.config.shift_min, self.config.shift_max);
        if lo.is_finite() && hi.is_finite() {
            self.rng.gen_range(lo..=hi)
        } else {
            0.0
        }
    }

    fn output(&self, shifted: bool, reason: ReasonCode) -> TickOutput {
        TickOutput {
            timestamp: chrono::Utc::now(),
            elapsed_ms: self.elapsed.as_millis() as u64,
            value: self.value,
            target_min: self.target_min,
            target_max: self.target_max,
            in_window: self.is_in_window(),
            status: self.status,
            consecutive_bad_ms: self.consecutive_bad_time.as_millis() as u64,
            shifted,
            reason,
        }
    }
}

impl<R> Session<R> {
    /// Is the value inside the sweet spot (bounds inclusive)?
    pub fn is_in_window(&self) -> bool {
        self.target_min <= self.value && self.value <= self.target_max
    }

    /// Percent of the session length spent in the window, floored
    pub fn quality_score(&self) -> u32 {
        let length = self.config.session_length().as_millis();
        if length == 0 {
            return 0;
        }
        (self.good_time.as_millis() * 100 / length) as u32
    }

    pub fn is_over(&self) -> bool {
        self.elapsed >= self.config.session_length() || self.status == SessionStatus::Failed
    }

    /// Share of the failure limit used by the current streak, capped at 1
    pub fn failure_progress(&self) -> f64 {
        let limit = self.config.max_failure().as_secs_f64();
        if limit <= 0.0 {
            return 1.0;
        }
        (self.consecutive_bad_time.as_secs_f64() / limit).min(1.0)
    }

    pub fn is_failure_warning(&self) -> bool {
        self.consecutive_bad_time >= self.config.warning() && self.status != SessionStatus::Failed
    }

    pub fn time_remaining(&self) -> Duration {
        if self.status == SessionStatus::NotStarted {
            return self.config.session_length();
        }
        self.config.session_length().saturating_sub(self.elapsed)
    }

    pub fn time_until_failure(&self) -> Duration {
        self.config.max_failure().saturating_sub(self.consecutive_bad_time)
    }

    /// Score and failure state once the session is over
    pub fn outcome(&self) -> Option<SessionOutcome> {
        if self.status == SessionStatus::NotStarted || !self.is_over() {
            return None;
        }
        Some(SessionOutcome {
            score: self.quality_score(),
            failed: self.status == SessionStatus::Failed,
            reason: self.failure_reason.clone(),
        })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn target_center(&self) -> f64 {
        self.target_center
    }

    pub fn target_min(&self) -> f64 {
        self.target_min
    }

    pub fn target_max(&self) -> f64 {
        self.target_max
    }

    pub fn sweet_spot_range(&self) -> (f64, f64) {
        (self.target_min, self.target_max)
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn good_time(&self) -> Duration {
        self.good_time
    }

    pub fn bad_time(&self) -> Duration {
        self.bad_time
    }

    pub fn consecutive_bad_time(&self) -> Duration {
        self.consecutive_bad_time
    }

    pub fn next_shift_in(&self) -> Duration {
        self.next_shift_in
    }

    pub fn last_shift_at(&self) -> Duration {
        self.last_shift_at
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }
}

// =============================================================================
// TESTS
// =============================================================================
