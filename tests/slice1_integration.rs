//! Integration tests for Slice 1
//!
//! Tests the full session path: start → adjust/tick → terminal status → outcome

use std::time::Duration;

use sweetspot::core::Session;
use sweetspot::types::{Direction, GameConfig, ReasonCode, SessionStatus};
use sweetspot::{FAILURE_REASON_TOO_LONG_OUTSIDE, SWEET_SPOT_SIZE, TEMPERATURE_MAX, TEMPERATURE_MIN};

const TICK: Duration = Duration::from_millis(100);

fn still_config() -> GameConfig {
    GameConfig {
        shift_min: 0.0,
        shift_max: 0.0,
        ..GameConfig::default()
    }
}

/// Step toward the window when outside it, then tick
fn track_tick(session: &mut Session) {
    if session.value() < session.target_min() {
        session.adjust(Direction::Up);
    } else if session.value() > session.target_max() {
        session.adjust(Direction::Down);
    }
    session.tick(TICK);
}

/// A tracking player survives a full session with drifting windows
#[test]
fn test_tracking_player_succeeds() {
    for seed in [1, 7, 42, 1234] {
        let mut session = Session::seeded(GameConfig::default(), seed);
        session.start();

        let mut ticks = 0;
        while session.status() == SessionStatus::Running {
            track_tick(&mut session);
            ticks += 1;
        }

        assert_eq!(session.status(), SessionStatus::Succeeded, "seed {}", seed);
        assert_eq!(ticks, 600);
        assert_eq!(session.elapsed(), Duration::from_secs(60));
        let outcome = session.outcome().unwrap();
        assert!(!outcome.failed);
        assert!(outcome.score >= 85, "seed {} scored {}", seed, outcome.score);
        assert!(outcome.score <= 100);
    }
}

/// An idle player stuck outside fails at exactly the limit
#[test]
fn test_idle_player_fails_at_fifteen_seconds() {
    let mut session = Session::seeded(still_config(), 3);
    session.start();
    for _ in 0..25 {
        session.adjust(Direction::Down);
    }

    let mut last_reason = ReasonCode::S001_IN_WINDOW;
    while session.status() == SessionStatus::Running {
        last_reason = session.tick(TICK).reason;
    }

    assert_eq!(last_reason, ReasonCode::S005_TRANSITION_TO_FAILED);
    assert_eq!(session.status(), SessionStatus::Failed);
    assert_eq!(session.elapsed(), Duration::from_secs(15));
    assert_eq!(session.failure_reason(), Some(FAILURE_REASON_TOO_LONG_OUTSIDE));

    let outcome = session.outcome().unwrap();
    assert!(outcome.failed);
    assert_eq!(outcome.score, 0);
}

/// Same seed and same inputs replay the same session
#[test]
fn test_seeded_sessions_replay() {
    let run = |seed: u64| {
        let mut session = Session::seeded(GameConfig::default(), seed);
        session.start();
        let mut trace = Vec::new();
        while session.status() == SessionStatus::Running {
            if trace.len() % 7 == 0 {
                session.adjust(Direction::Up);
            }
            let out = session.tick(TICK);
            trace.push((out.elapsed_ms, out.value, out.target_min, out.status, out.shifted));
        }
        trace
    };

    assert_eq!(run(99), run(99));
    assert_ne!(run(99), run(100));
}

/// Window, failure and history invariants hold on every tick
#[test]
fn test_invariants_hold_throughout() {
    let config = GameConfig::default();
    let retention = config.history_retention();
    let max_failure = config.max_failure();

    for seed in 0..20u64 {
        let mut session = Session::seeded(config.clone(), seed);
        session.start();
        let mut step = 0u64;
        while session.status() == SessionStatus::Running {
            // Wander up and down in long strokes
            let direction = if (step / 40) % 2 == 0 { Direction::Up } else { Direction::Down };
            if step % 3 == 0 {
                session.adjust(direction);
            }
            session.tick(TICK);
            step += 1;

            assert!(session.target_min() >= TEMPERATURE_MIN);
            assert!(session.target_max() <= TEMPERATURE_MAX);
            assert!((session.target_max() - session.target_min() - SWEET_SPOT_SIZE).abs() < 1e-9);
            assert!(session.value() >= TEMPERATURE_MIN && session.value() <= TEMPERATURE_MAX);
            assert!(session.consecutive_bad_time() <= max_failure);
            assert!(session.quality_score() <= 100);

            let elapsed = session.elapsed();
            let floor = elapsed.saturating_sub(retention);
            let mut prev = Duration::ZERO;
            for sample in session.history().samples() {
                assert!(sample.at >= prev);
                assert!(sample.at >= floor && sample.at <= elapsed);
                prev = sample.at;
            }
        }
        assert!(session.is_over());
    }
}

/// 42 seconds in the window out of 60 scores 70
#[test]
fn test_quality_score_from_good_time() {
    let mut session = Session::seeded(still_config(), 5);
    session.start();
    for _ in 0..25 {
        session.adjust(Direction::Down);
    }
    for _ in 0..10 {
        session.adjust(Direction::Up);
    }

    // 42s in, then alternate out stretches shorter than the failure limit
    for _ in 0..420 {
        session.tick(TICK);
    }
    session.adjust(Direction::Up);
    session.adjust(Direction::Up);
    for _ in 0..100 {
        session.tick(TICK);
    }
    session.adjust(Direction::Down);
    session.tick(TICK);
    session.adjust(Direction::Up);
    for _ in 0..79 {
        session.tick(TICK);
    }

    assert_eq!(session.status(), SessionStatus::Succeeded);
    assert_eq!(session.good_time(), Duration::from_millis(42_100));
    assert_eq!(session.quality_score(), 70);
}

/// Once over, nothing moves
#[test]
fn test_finished_session_is_frozen() {
    let mut session = Session::seeded(still_config(), 8);
    session.start();
    while session.status() == SessionStatus::Running {
        session.tick(Duration::from_secs(1));
    }
    let value = session.value();
    let elapsed = session.elapsed();

    assert!(!session.adjust(Direction::Up));
    let out = session.tick(TICK);
    assert_eq!(out.reason, ReasonCode::S002_STATE_OVER);
    assert_eq!(session.value(), value);
    assert_eq!(session.elapsed(), elapsed);

    // A new run starts clean
    session.start();
    assert_eq!(session.status(), SessionStatus::Running);
    assert_eq!(session.elapsed(), Duration::ZERO);
    assert!(session.outcome().is_none());
}
