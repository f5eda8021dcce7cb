//! Game configuration
//!
//! Defaults come from the constants in the crate root. A JSON file may
//! override any subset of fields.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunable parameters shared by the session, feedback and drivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub value_min: f64,
    pub value_max: f64,
    /// Step of one adjustment
    pub increment: f64,
    /// Width of the sweet spot
    pub window_size: f64,
    pub window_start_center: f64,
    pub shift_interval_min_ms: u64,
    pub shift_interval_max_ms: u64,
    /// Bounds of one relocation delta
    pub shift_min: f64,
    pub shift_max: f64,
    pub max_failure_ms: u64,
    pub warning_ms: u64,
    pub session_length_ms: u64,
    pub feedback_delay_ms: u64,
    pub tick_interval_ms: u64,
    pub history_retention_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            value_min: crate::TEMPERATURE_MIN,
            value_max: crate::TEMPERATURE_MAX,
            increment: crate::TEMPERATURE_INCREMENT,
            window_size: crate::SWEET_SPOT_SIZE,
            window_start_center: crate::SWEET_SPOT_START_CENTER,
            shift_interval_min_ms: crate::SWEET_SPOT_SHIFT_MIN_INTERVAL_MS,
            shift_interval_max_ms: crate::SWEET_SPOT_SHIFT_MAX_INTERVAL_MS,
            shift_min: crate::SWEET_SPOT_SHIFT_MIN,
            shift_max: crate::SWEET_SPOT_SHIFT_MAX,
            max_failure_ms: crate::MAX_FAILURE_MS,
            warning_ms: crate::FAILURE_WARNING_MS,
            session_length_ms: crate::TOTAL_GAME_MS,
            feedback_delay_ms: crate::FEEDBACK_DELAY_MS,
            tick_interval_ms: crate::UPDATE_INTERVAL_MS,
            history_retention_ms: crate::HISTORY_RETENTION_MS,
        }
    }
}

impl GameConfig {
    /// Load from a JSON file and validate
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: GameConfig =
            serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every range is well formed
    pub fn validate(&self) -> Result<(), ConfigError> {
        let floats = [
            ("value_min", self.value_min),
            ("value_max", self.value_max),
            ("increment", self.increment),
            ("window_size", self.window_size),
            ("window_start_center", self.window_start_center),
            ("shift_min", self.shift_min),
            ("shift_max", self.shift_max),
        ];
        if let Some((name, _)) = floats.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Invalid(format!("{} must be finite", name)));
        }
        if self.value_min >= self.value_max {
            return Err(ConfigError::Invalid(
                "value_min must be below value_max".to_string(),
            ));
        }
        if self.window_size <= 0.0 || self.window_size > self.value_max - self.value_min {
            return Err(ConfigError::Invalid(
                "window_size must be positive and fit inside the value range".to_string(),
            ));
        }
        if self.increment < 0.0 {
            return Err(ConfigError::Invalid("increment must not be negative".to_string()));
        }
        if self.shift_interval_min_ms > self.shift_interval_max_ms {
            return Err(ConfigError::Invalid(
                "shift_interval_min_ms exceeds shift_interval_max_ms".to_string(),
            ));
        }
        if self.shift_min > self.shift_max {
            return Err(ConfigError::Invalid("shift_min exceeds shift_max".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".to_string()));
        }
        if self.max_failure_ms == 0 {
            return Err(ConfigError::Invalid("max_failure_ms must be positive".to_string()));
        }
        if self.warning_ms > self.max_failure_ms {
            return Err(ConfigError::Invalid(
                "warning_ms must not exceed max_failure_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Window center clamped so the whole window stays inside [min, max].
    /// A window wider than the range sits at the middle of the range.
    pub fn clamp_center(&self, center: f64) -> f64 {
        let half = self.window_size / 2.0;
        let (lo, hi) = (self.value_min + half, self.value_max - half);
        if lo <= hi {
            center.clamp(lo, hi)
        } else {
            (self.value_min + self.value_max) / 2.0
        }
    }

    /// Value clamped to [min, max]; inverted bounds are read in order
    pub fn clamp_value(&self, value: f64) -> f64 {
        let (lo, hi) = ordered(self.value_min, self.value_max);
        value.max(lo).min(hi)
    }

    pub fn session_length(&self) -> Duration {
        Duration::from_millis(self.session_length_ms)
    }

    pub fn max_failure(&self) -> Duration {
        Duration::from_millis(self.max_failure_ms)
    }

    pub fn warning(&self) -> Duration {
        Duration::from_millis(self.warning_ms)
    }

    pub fn feedback_delay(&self) -> Duration {
        Duration::from_millis(self.feedback_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn history_retention(&self) -> Duration {
        Duration::from_millis(self.history_retention_ms)
    }
}

/// `(a, b)` sorted ascending
pub(crate) fn ordered<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if b < a {
        (b, a)
    } else {
        (a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session_length(), Duration::from_secs(60));
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_clamp_center_keeps_window_inside() {
        let config = GameConfig::default();
        assert_eq!(config.clamp_center(-40.0), 5.0);
        assert_eq!(config.clamp_center(140.0), 95.0);
        assert_eq!(config.clamp_center(42.0), 42.0);
    }

    #[test]
    fn test_clamps_tolerate_unvalidated_bounds() {
        let config = GameConfig {
            window_size: 300.0,
            value_min: 100.0,
            value_max: 0.0,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.clamp_center(80.0), 50.0);
        assert_eq!(config.clamp_value(140.0), 100.0);
        assert_eq!(config.clamp_value(-3.0), 0.0);
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let mut config = GameConfig::default();
        config.value_min = 100.0;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.window_size = 200.0;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.shift_interval_min_ms = 20_000;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = GameConfig::default();
        config.shift_max = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"session_length_ms": 30000, "increment": 2.5}}"#).unwrap();

        let config = GameConfig::from_file(file.path()).unwrap();
        assert_eq!(config.session_length_ms, 30_000);
        assert_eq!(config.increment, 2.5);
        assert_eq!(config.window_size, crate::SWEET_SPOT_SIZE);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            GameConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
