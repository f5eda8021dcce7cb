//! Reason codes for tick outcomes and session transitions

use serde::{Deserialize, Serialize};

/// Reason codes attached to every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // S001: Window membership
    // =========================================================================
    /// Value inside the sweet spot, good time accruing
    S001_IN_WINDOW,
    /// Value outside the sweet spot, bad time accruing
    S001_OUT_OF_WINDOW,

    // =========================================================================
    // S002: Inert ticks
    // =========================================================================
    /// Session not started yet
    S002_STATE_NOT_STARTED,
    /// Session already over, tick ignored
    S002_STATE_OVER,

    // =========================================================================
    // S003: Window movement
    // =========================================================================
    /// Sweet spot relocated this tick
    S003_WINDOW_SHIFTED,

    // =========================================================================
    // S004: Failure tracking
    // =========================================================================
    /// Consecutive bad time past the warning threshold
    S004_FAILURE_WARNING,

    // =========================================================================
    // S005: Transitions
    // =========================================================================
    /// Session length reached, RUNNING → SUCCEEDED
    S005_TRANSITION_TO_SUCCEEDED,
    /// Failure limit reached, RUNNING → FAILED
    S005_TRANSITION_TO_FAILED,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::S001_IN_WINDOW => "S001_IN_WINDOW",
            Self::S001_OUT_OF_WINDOW => "S001_OUT_OF_WINDOW",
            Self::S002_STATE_NOT_STARTED => "S002_STATE_NOT_STARTED",
            Self::S002_STATE_OVER => "S002_STATE_OVER",
            Self::S003_WINDOW_SHIFTED => "S003_WINDOW_SHIFTED",
            Self::S004_FAILURE_WARNING => "S004_FAILURE_WARNING",
            Self::S005_TRANSITION_TO_SUCCEEDED => "S005_TRANSITION_TO_SUCCEEDED",
            Self::S005_TRANSITION_TO_FAILED => "S005_TRANSITION_TO_FAILED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::S001_IN_WINDOW => "In the sweet spot",
            Self::S001_OUT_OF_WINDOW => "Outside the sweet spot",
            Self::S002_STATE_NOT_STARTED => "Session not started",
            Self::S002_STATE_OVER => "Session over",
            Self::S003_WINDOW_SHIFTED => "Sweet spot moved",
            Self::S004_FAILURE_WARNING => "Close to failing",
            Self::S005_TRANSITION_TO_SUCCEEDED => "Cooking complete",
            Self::S005_TRANSITION_TO_FAILED => "Cook failed",
        }
    }

    /// Does this code end the session?
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            Self::S005_TRANSITION_TO_SUCCEEDED | Self::S005_TRANSITION_TO_FAILED
        )
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
