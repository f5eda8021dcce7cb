//! Session status definitions

use serde::{Deserialize, Serialize};

/// The four possible states of a cooking session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Created, waiting for start
    NotStarted,
    /// Ticking; value can be adjusted
    Running,
    /// Session length reached without failing
    Succeeded,
    /// Too long outside the sweet spot
    Failed,
}

impl SessionStatus {
    /// True once the session can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Succeeded | SessionStatus::Failed)
    }

    /// Get emoji for status
    pub fn emoji(&self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "⏳",
            SessionStatus::Running => "🔥",
            SessionStatus::Succeeded => "🍽️",
            SessionStatus::Failed => "❌",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionStatus::NotStarted => "NOT_STARTED",
            SessionStatus::Running => "RUNNING",
            SessionStatus::Succeeded => "SUCCEEDED",
            SessionStatus::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// Direction of a single temperature adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// +1 for up, -1 for down
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!SessionStatus::NotStarted.is_terminal());
        assert!(!SessionStatus::Running.is_terminal());
        assert!(SessionStatus::Succeeded.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&SessionStatus::NotStarted).unwrap();
        assert_eq!(json, "\"NOT_STARTED\"");
        let dir: Direction = serde_json::from_str("\"down\"").unwrap();
        assert_eq!(dir, Direction::Down);
    }
}
