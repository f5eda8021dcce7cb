//! Sweetspot: temperature control game engine
//!
//! Session state machine → delayed feedback → tray ledger

pub mod core;
pub mod error;
pub mod types;

// =============================================================================
// TEMPERATURE [C]
// =============================================================================

/// Lowest reachable temperature
pub const TEMPERATURE_MIN: f64 = 0.0;

/// Highest reachable temperature
pub const TEMPERATURE_MAX: f64 = 100.0;

/// Step applied by one up/down adjustment
pub const TEMPERATURE_INCREMENT: f64 = 5.0;

// =============================================================================
// SWEET SPOT [C]
// =============================================================================

/// Width of the target window (±5 around center)
pub const SWEET_SPOT_SIZE: f64 = 10.0;

/// Window center at session start
pub const SWEET_SPOT_START_CENTER: f64 = 50.0;

/// Shortest wait between window relocations (milliseconds)
pub const SWEET_SPOT_SHIFT_MIN_INTERVAL_MS: u64 = 6000;

/// Longest wait between window relocations (milliseconds)
pub const SWEET_SPOT_SHIFT_MAX_INTERVAL_MS: u64 = 14000;

/// Relocation delta bounds
pub const SWEET_SPOT_SHIFT_MIN: f64 = -20.0;
pub const SWEET_SPOT_SHIFT_MAX: f64 = 20.0;

// =============================================================================
// FAILURE [C]
// =============================================================================

/// Consecutive time outside the window that fails the cook (milliseconds)
pub const MAX_FAILURE_MS: u64 = 15000;

/// Consecutive time outside the window that starts the warning (milliseconds)
pub const FAILURE_WARNING_MS: u64 = 10000;

/// Reason attached to a failed session
pub const FAILURE_REASON_TOO_LONG_OUTSIDE: &str = "Too long outside sweet spot";

// =============================================================================
// TIMING [C]
// =============================================================================

/// Session length (milliseconds)
pub const TOTAL_GAME_MS: u64 = 60000;

/// Sensor lag for delayed feedback (milliseconds)
pub const FEEDBACK_DELAY_MS: u64 = 500;

/// Fixed tick period (milliseconds) - 10 updates per second
pub const UPDATE_INTERVAL_MS: u64 = 100;

/// How far back the in/out history reaches (milliseconds)
pub const HISTORY_RETENTION_MS: u64 = 10000;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
