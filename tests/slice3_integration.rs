//! Integration tests for Slice 3
//!
//! Tests the reward path: finished session → Ledger → stats → liquidation

use std::time::Duration;

use pretty_assertions::assert_eq;
use sweetspot::core::{quality_tier, reward_count, Ledger, MemoryStore, Session};
use sweetspot::types::{Direction, GameConfig, Outcome, QualityTier, SessionStatus};
use sweetspot::FAILURE_REASON_TOO_LONG_OUTSIDE;

fn ledger() -> Ledger {
    Ledger::open(MemoryStore::new())
}

/// Tier and tray count table
#[test]
fn test_tier_table() {
    let cases = [
        (0, QualityTier::Poor, 1),
        (29, QualityTier::Poor, 1),
        (30, QualityTier::Average, 1),
        (49, QualityTier::Average, 1),
        (50, QualityTier::Good, 1),
        (60, QualityTier::Good, 2),
        (69, QualityTier::Good, 2),
        (70, QualityTier::Great, 2),
        (80, QualityTier::Excellent, 3),
        (89, QualityTier::Excellent, 3),
        (90, QualityTier::Amazing, 3),
        (100, QualityTier::Amazing, 3),
    ];
    for (score, tier, count) in cases {
        assert_eq!(quality_tier(score), tier, "score {}", score);
        assert_eq!(reward_count(score), count, "score {}", score);
    }
}

/// Score 85 earns three Excellent trays
#[test]
fn test_excellent_cook() {
    let mut ledger = ledger();
    let recorded = ledger.record_outcome(85, false, None);

    assert_eq!(recorded.value.reward_units(), 3);
    assert!(matches!(
        recorded.value,
        Outcome::Succeeded { quality: QualityTier::Excellent, new_best_score: true, .. }
    ));
    let stats = ledger.stats();
    assert_eq!(stats.total_trays, 3);
    assert_eq!(stats.best_score, 85);
    assert_eq!(stats.quality_counts.get(&QualityTier::Excellent), Some(&3));
}

/// A failed cook at 20 earns nothing
#[test]
fn test_failed_cook() {
    let mut ledger = ledger();
    let recorded = ledger.record_outcome(20, true, Some(FAILURE_REASON_TOO_LONG_OUTSIDE));

    assert_eq!(
        recorded.value,
        Outcome::Failed {
            reason: Some(FAILURE_REASON_TOO_LONG_OUTSIDE.to_string()),
            score: 20,
            reward_units: 0,
        }
    );
    let stats = ledger.stats();
    assert_eq!(stats.total_trays, 0);
    assert_eq!(stats.total_failures, 1);
    assert_eq!(stats.total_games, 1);
    assert_eq!(stats.success_rate, 0);
}

/// Sell everything, then check what the stats still remember
#[test]
fn test_liquidate_then_stats() {
    let mut ledger = ledger();
    ledger.record_outcome(92, false, None); // 3 x Amazing = 150
    ledger.record_outcome(72, false, None); // 2 x Great = 60
    ledger.record_outcome(10, false, None); // 1 x Poor = 10
    ledger.record_outcome(40, true, Some(FAILURE_REASON_TOO_LONG_OUTSIDE));

    let sale = ledger.liquidate();
    assert_eq!(sale.value.amount, 220);
    assert_eq!(sale.value.trays_sold, 6);
    assert_eq!(sale.value.cash_balance, 220);

    let stats = ledger.stats();
    assert_eq!(stats.total_trays, 0);
    assert_eq!(stats.total_games, 4);
    assert_eq!(stats.total_failures, 1);
    assert_eq!(stats.successful_games, 3);
    assert_eq!(stats.success_rate, 75);
    assert_eq!(stats.best_score, 92);
    assert_eq!(stats.average_score, 0);
    assert_eq!(stats.cash, 220);
    assert!(stats.quality_counts.is_empty());
    assert_eq!(stats.failure_reasons.get(FAILURE_REASON_TOO_LONG_OUTSIDE), Some(&1));
}

/// Failures never change the tray inventory, whatever the score
#[test]
fn test_failures_leave_trays_alone() {
    let mut ledger = ledger();
    ledger.record_outcome(75, false, None);
    let trays_before = ledger.aggregate().trays.clone();

    for score in [0, 33, 66, 99, 100] {
        let recorded = ledger.record_outcome(score, true, None);
        assert_eq!(recorded.value.reward_units(), 0);
    }
    assert_eq!(ledger.aggregate().trays, trays_before);
    assert_eq!(ledger.stats().best_score, 75);
}

/// Tray timestamps stay unique even when games land in the same millisecond
#[test]
fn test_tray_timestamps_unique() {
    let mut ledger = ledger();
    for _ in 0..10 {
        ledger.record_outcome(88, false, None);
    }
    let mut stamps: Vec<i64> = ledger.aggregate().trays.iter().map(|t| t.timestamp).collect();
    assert_eq!(stamps.len(), 30);
    stamps.sort_unstable();
    stamps.dedup();
    assert_eq!(stamps.len(), 30);
}

/// A whole session flows into the ledger exactly as its outcome says
#[test]
fn test_session_into_ledger() {
    let config = GameConfig {
        shift_min: 0.0,
        shift_max: 0.0,
        ..GameConfig::default()
    };
    let mut session = Session::seeded(config, 12);
    session.start();
    for _ in 0..25 {
        session.adjust(Direction::Down);
    }
    for _ in 0..10 {
        session.adjust(Direction::Up);
    }
    while session.status() == SessionStatus::Running {
        session.tick(Duration::from_millis(100));
    }

    let outcome = session.outcome().unwrap();
    assert_eq!(outcome.score, 100);

    let mut ledger = ledger();
    let recorded = ledger.record_session(&outcome);
    assert!(recorded.persisted);
    assert_eq!(recorded.value.reward_units(), 3);
    assert_eq!(ledger.stats().best_score, 100);
    assert_eq!(ledger.recent_trays(1)[0].quality, QualityTier::Amazing);
}
