//! Reward ledger: tiers, tray awards, stats and liquidation
//!
//! Key invariant: a failed cook never earns trays.
//! Every mutation is read-modify-write-persist against the in-memory
//! aggregate, which stays authoritative if the store rejects a write.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::store::LedgerStore;
use crate::core::SessionOutcome;
use crate::error::LedgerError;
use crate::types::{
    ActivityEntry, FailedCook, LedgerAggregate, LedgerStats, Liquidation, Outcome, QualityTier,
    Recorded, TrayRecord, LEDGER_SCHEMA_VERSION,
};

/// Tier for a quality score
pub fn quality_tier(score: u32) -> QualityTier {
    QualityTier::from_score(score)
}

/// Trays awarded for a successful cook; never less than one
pub fn reward_count(score: u32) -> u32 {
    match score {
        80.. => 3,
        60..=79 => 2,
        _ => 1,
    }
}

/// Persisted tray inventory and game statistics
pub struct Ledger {
    store: Box<dyn LedgerStore>,
    data: LedgerAggregate,
    last_write_error: Option<LedgerError>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("data", &self.data)
            .field("last_write_error", &self.last_write_error)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Load from the store, falling back to an empty ledger if the stored
    /// blob is missing or unreadable
    pub fn open(store: impl LedgerStore + 'static) -> Self {
        Self::open_boxed(Box::new(store))
    }

    pub fn open_boxed(store: Box<dyn LedgerStore>) -> Self {
        let data = match store.load() {
            Ok(None) => {
                debug!("No stored ledger, starting empty");
                LedgerAggregate::default()
            }
            Ok(Some(blob)) => match LedgerAggregate::from_stored(&blob) {
                Ok(migration) => {
                    if migration.from_version != LEDGER_SCHEMA_VERSION || !migration.repaired.is_empty() {
                        info!(
                            from_version = migration.from_version,
                            repaired = ?migration.repaired,
                            "Ledger migrated"
                        );
                    }
                    migration.aggregate
                }
                Err(e) => {
                    warn!(error = %e, "Stored ledger unreadable, starting fresh");
                    LedgerAggregate::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "Ledger read failed, starting fresh");
                LedgerAggregate::default()
            }
        };

        Self {
            store,
            data,
            last_write_error: None,
        }
    }

    /// Record a finished session at the current wall-clock time
    pub fn record_outcome(&mut self, score: u32, failed: bool, reason: Option<&str>) -> Recorded<Outcome> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.record_outcome_at(now_ms, score, failed, reason)
    }

    /// Record a session outcome produced by the engine
    pub fn record_session(&mut self, outcome: &SessionOutcome) -> Recorded<Outcome> {
        self.record_outcome(outcome.score, outcome.failed, outcome.reason.as_deref())
    }

    /// Record a finished session with an explicit timestamp (unix ms)
    pub fn record_outcome_at(
        &mut self,
        now_ms: i64,
        score: u32,
        failed: bool,
        reason: Option<&str>,
    ) -> Recorded<Outcome> {
        let game_number = self.data.total_games + 1;

        let outcome = if failed {
            self.data.failed_cooks.push(FailedCook {
                score,
                reason: reason.map(str::to_string),
                timestamp: now_ms,
                game_number,
            });
            self.data.total_failures += 1;
            self.data.total_games += 1;
            info!(score, game_number, reason = reason.unwrap_or(""), "Failed cook recorded, no trays");

            Outcome::Failed {
                reason: reason.map(str::to_string),
                score,
                reward_units: 0,
            }
        } else {
            let quality = quality_tier(score);
            let count = reward_count(score);
            let previous_best = self.data.best_score;

            // Tray timestamps stay unique across games recorded in the same millisecond
            let base = self
                .data
                .trays
                .iter()
                .map(|t| t.timestamp)
                .max()
                .map_or(now_ms, |last| now_ms.max(last + 1));
            for i in 0..count {
                self.data.trays.push(TrayRecord {
                    quality,
                    score,
                    timestamp: base + i as i64,
                    game_number,
                });
            }
            self.data.total_trays += count as u64;
            self.data.best_score = previous_best.max(score);
            self.data.total_games += 1;
            info!(score, game_number, %quality, trays = count, "Successful cook recorded");

            Outcome::Succeeded {
                reward_units: count,
                quality,
                new_best_score: score >= previous_best,
            }
        };

        let persisted = self.persist();
        Recorded { value: outcome, persisted }
    }

    /// Derived statistics for display
    pub fn stats(&self) -> LedgerStats {
        let mut quality_counts: BTreeMap<QualityTier, u64> = BTreeMap::new();
        for tray in &self.data.trays {
            *quality_counts.entry(tray.quality).or_insert(0) += 1;
        }

        let mut failure_reasons: BTreeMap<String, u64> = BTreeMap::new();
        for cook in &self.data.failed_cooks {
            let reason = cook.reason.clone().unwrap_or_else(|| "Unknown".to_string());
            *failure_reasons.entry(reason).or_insert(0) += 1;
        }

        let games = self.data.total_games;
        let successful_games = games.saturating_sub(self.data.total_failures);
        let success_rate = if games > 0 {
            (successful_games as f64 / games as f64 * 100.0).round() as u32
        } else {
            0
        };

        let average_score = if self.data.trays.is_empty() {
            0
        } else {
            let sum: u64 = self.data.trays.iter().map(|t| t.score as u64).sum();
            (sum as f64 / self.data.trays.len() as f64).round() as u32
        };

        LedgerStats {
            total_trays: self.data.total_trays,
            total_games: games,
            total_failures: self.data.total_failures,
            successful_games,
            success_rate,
            best_score: self.data.best_score,
            average_score,
            quality_counts,
            failure_reasons,
            cash: self.data.cash,
        }
    }

    /// Sell every tray for cash; failure records stay
    pub fn liquidate(&mut self) -> Recorded<Liquidation> {
        let amount: u64 = self.data.trays.iter().map(|t| t.quality.tray_value()).sum();
        let trays_sold = self.data.trays.len();

        self.data.cash += amount;
        self.data.trays.clear();
        self.data.total_trays = 0;
        info!(amount, trays_sold, cash = self.data.cash, "Trays sold");

        let persisted = self.persist();
        Recorded {
            value: Liquidation {
                amount,
                trays_sold,
                cash_balance: self.data.cash,
            },
            persisted,
        }
    }

    /// Wipe everything, cash included; returns whether the write persisted
    pub fn clear(&mut self) -> bool {
        self.data = LedgerAggregate::default();
        info!("Ledger cleared");
        self.persist()
    }

    /// Pretty JSON of the whole aggregate
    pub fn export(&self) -> Result<String, LedgerError> {
        serde_json::to_string_pretty(&self.data).map_err(LedgerError::Serialize)
    }

    /// Replace the aggregate with an exported one. Rejected imports leave the
    /// ledger unchanged. Ok carries whether the write persisted.
    pub fn import(&mut self, json: &str) -> Result<bool, LedgerError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| LedgerError::InvalidImport(format!("not JSON: {}", e)))?;
        if !value.get("trays").is_some_and(Value::is_array) {
            return Err(LedgerError::InvalidImport("missing trays array".to_string()));
        }
        let migration = LedgerAggregate::migrate(value)
            .map_err(|e| LedgerError::InvalidImport(e.to_string()))?;

        self.data = migration.aggregate;
        info!(
            trays = self.data.trays.len(),
            games = self.data.total_games,
            "Ledger imported"
        );
        Ok(self.persist())
    }

    /// Newest trays first
    pub fn recent_trays(&self, count: usize) -> Vec<TrayRecord> {
        let mut trays = self.data.trays.clone();
        trays.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        trays.truncate(count);
        trays
    }

    /// Newest failures first
    pub fn recent_failures(&self, count: usize) -> Vec<FailedCook> {
        let mut cooks = self.data.failed_cooks.clone();
        cooks.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        cooks.truncate(count);
        cooks
    }

    /// Trays and failures merged, newest first
    pub fn recent_activity(&self, count: usize) -> Vec<ActivityEntry> {
        let mut activity: Vec<ActivityEntry> = self
            .data
            .trays
            .iter()
            .cloned()
            .map(ActivityEntry::Success)
            .chain(self.data.failed_cooks.iter().cloned().map(ActivityEntry::Failure))
            .collect();
        activity.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        activity.truncate(count);
        activity
    }

    pub fn cash(&self) -> u64 {
        self.data.cash
    }

    pub fn aggregate(&self) -> &LedgerAggregate {
        &self.data
    }

    /// Error from the most recent write, cleared by the next good write
    pub fn last_write_error(&self) -> Option<&LedgerError> {
        self.last_write_error.as_ref()
    }

    fn persist(&mut self) -> bool {
        let result = self
            .data
            .to_stored()
            .and_then(|blob| self.store.save(&blob));
        match result {
            Ok(()) => {
                self.last_write_error = None;
                true
            }
            Err(e) => {
                warn!(error = %e, "Ledger write failed, keeping in-memory state");
                self.last_write_error = Some(e);
                false
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use pretty_assertions::assert_eq;

    /// Store that loads nothing and rejects every write
    struct BrokenStore;

    impl LedgerStore for BrokenStore {
        fn load(&self) -> Result<Option<String>, LedgerError> {
            Ok(None)
        }

        fn save(&self, _blob: &str) -> Result<(), LedgerError> {
            Err(LedgerError::Unavailable("disk full".to_string()))
        }
    }

    fn ledger() -> Ledger {
        Ledger::open(MemoryStore::new())
    }

    #[test]
    fn test_tier_and_count_monotone() {
        let mut prev_tier = quality_tier(0);
        let mut prev_count = reward_count(0);
        for score in 0..=100 {
            let tier = quality_tier(score);
            let count = reward_count(score);
            assert!(tier >= prev_tier, "tier dropped at {}", score);
            assert!(count >= prev_count, "count dropped at {}", score);
            assert!(count >= 1);
            prev_tier = tier;
            prev_count = count;
        }
    }

    #[test]
    fn test_reward_count_boundaries() {
        assert_eq!(reward_count(0), 1);
        assert_eq!(reward_count(59), 1);
        assert_eq!(reward_count(60), 2);
        assert_eq!(reward_count(79), 2);
        assert_eq!(reward_count(80), 3);
        assert_eq!(reward_count(100), 3);
    }

    #[test]
    fn test_success_awards_trays() {
        let mut ledger = ledger();
        let recorded = ledger.record_outcome_at(1_000, 85, false, None);

        assert!(recorded.persisted);
        assert_eq!(
            recorded.value,
            Outcome::Succeeded {
                reward_units: 3,
                quality: QualityTier::Excellent,
                new_best_score: true,
            }
        );
        let data = ledger.aggregate();
        assert_eq!(data.total_trays, 3);
        assert_eq!(data.trays.len(), 3);
        assert_eq!(data.total_games, 1);
        assert_eq!(data.best_score, 85);
        assert!(data.trays.iter().all(|t| t.game_number == 1 && t.quality == QualityTier::Excellent));
    }

    #[test]
    fn test_failure_never_awards_trays() {
        let mut ledger = ledger();
        for score in [0, 50, 95, 100] {
            let recorded = ledger.record_outcome(score, true, Some("Too long outside sweet spot"));
            assert_eq!(recorded.value.reward_units(), 0);
            assert!(recorded.value.is_failed());
        }
        let data = ledger.aggregate();
        assert!(data.trays.is_empty());
        assert_eq!(data.total_trays, 0);
        assert_eq!(data.total_failures, 4);
        assert_eq!(data.total_games, 4);
        assert_eq!(data.best_score, 0);
    }

    #[test]
    fn test_tray_timestamps_distinct_across_games() {
        let mut ledger = ledger();
        ledger.record_outcome_at(500, 90, false, None);
        ledger.record_outcome_at(500, 65, false, None);

        let mut stamps: Vec<i64> = ledger.aggregate().trays.iter().map(|t| t.timestamp).collect();
        assert_eq!(stamps, vec![500, 501, 502, 503, 504]);
        stamps.dedup();
        assert_eq!(stamps.len(), 5);
    }

    #[test]
    fn test_new_best_compares_with_previous() {
        let mut ledger = ledger();
        ledger.record_outcome_at(1, 70, false, None);

        let lower = ledger.record_outcome_at(2, 40, false, None);
        assert!(matches!(lower.value, Outcome::Succeeded { new_best_score: false, .. }));

        let equal = ledger.record_outcome_at(3, 70, false, None);
        assert!(matches!(equal.value, Outcome::Succeeded { new_best_score: true, .. }));
        assert_eq!(ledger.aggregate().best_score, 70);
    }

    #[test]
    fn test_stats() {
        let mut ledger = ledger();
        assert_eq!(ledger.stats().success_rate, 0);
        assert_eq!(ledger.stats().average_score, 0);

        ledger.record_outcome_at(1, 85, false, None); // 3 Excellent
        ledger.record_outcome_at(2, 55, false, None); // 1 Good
        ledger.record_outcome_at(3, 12, true, Some("Too long outside sweet spot"));

        let stats = ledger.stats();
        assert_eq!(stats.total_games, 3);
        assert_eq!(stats.total_failures, 1);
        assert_eq!(stats.successful_games, 2);
        assert_eq!(stats.success_rate, 67);
        assert_eq!(stats.total_trays, 4);
        // (85 * 3 + 55) / 4 = 77.5
        assert_eq!(stats.average_score, 78);
        assert_eq!(stats.quality_counts.get(&QualityTier::Excellent), Some(&3));
        assert_eq!(stats.quality_counts.get(&QualityTier::Good), Some(&1));
        assert_eq!(stats.failure_reasons.get("Too long outside sweet spot"), Some(&1));
    }

    #[test]
    fn test_liquidate() {
        let mut ledger = ledger();
        ledger.record_outcome_at(1, 95, false, None); // 3 x 50
        ledger.record_outcome_at(2, 35, false, None); // 1 x 15
        ledger.record_outcome_at(3, 5, true, None);

        let sale = ledger.liquidate();
        assert_eq!(sale.value, Liquidation { amount: 165, trays_sold: 4, cash_balance: 165 });

        let stats = ledger.stats();
        assert_eq!(stats.total_trays, 0);
        assert_eq!(stats.total_games, 3);
        assert_eq!(stats.total_failures, 1);
        assert_eq!(stats.best_score, 95);
        assert_eq!(stats.cash, 165);
        assert_eq!(ledger.aggregate().failed_cooks.len(), 1);

        // Nothing left to sell
        assert_eq!(ledger.liquidate().value.amount, 0);
        assert_eq!(ledger.cash(), 165);
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let mut ledger = Ledger::open(BrokenStore);
        let recorded = ledger.record_outcome_at(1, 80, false, None);

        assert!(!recorded.persisted);
        assert!(ledger.last_write_error().is_some());
        assert_eq!(ledger.aggregate().total_trays, 3);
    }

    #[test]
    fn test_corrupt_store_starts_fresh() {
        let ledger = Ledger::open(MemoryStore::with_blob("{{{ nope"));
        assert_eq!(ledger.aggregate(), &LedgerAggregate::default());
    }

    #[test]
    fn test_import_rejects_bad_input() {
        let mut ledger = ledger();
        ledger.record_outcome_at(1, 72, false, None);
        let before = ledger.aggregate().clone();

        assert!(matches!(ledger.import("nope"), Err(LedgerError::InvalidImport(_))));
        assert!(matches!(ledger.import(r#"{"cash": 5}"#), Err(LedgerError::InvalidImport(_))));
        assert!(matches!(
            ledger.import(r#"{"trays": [], "schemaVersion": 99}"#),
            Err(LedgerError::InvalidImport(_))
        ));
        assert_eq!(ledger.aggregate(), &before);
    }

    #[test]
    fn test_export_import() {
        let mut source = ledger();
        source.record_outcome_at(1, 91, false, None);
        source.record_outcome_at(2, 3, true, Some("Too long outside sweet spot"));
        let exported = source.export().unwrap();

        let mut target = ledger();
        assert!(target.import(&exported).unwrap());
        assert_eq!(target.aggregate(), source.aggregate());
    }

    #[test]
    fn test_recent_activity_newest_first() {
        let mut ledger = ledger();
        ledger.record_outcome_at(100, 50, false, None);
        ledger.record_outcome_at(200, 10, true, Some("Too long outside sweet spot"));
        ledger.record_outcome_at(300, 62, false, None);

        let activity = ledger.recent_activity(3);
        let stamps: Vec<i64> = activity.iter().map(|a| a.timestamp()).collect();
        assert_eq!(stamps, vec![301, 300, 200]);
        assert_eq!(activity[2].label(), "Failed");

        assert_eq!(ledger.recent_trays(10).len(), 3);
        assert_eq!(ledger.recent_failures(10).len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut ledger = ledger();
        ledger.record_outcome_at(1, 99, false, None);
        ledger.liquidate();
        assert!(ledger.clear());
        assert_eq!(ledger.aggregate(), &LedgerAggregate::default());
    }
}
