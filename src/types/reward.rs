//! Reward types: quality tiers, tray and failure records, outcomes, stats

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Quality tier of a finished cook, ordered worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    Poor,
    Average,
    Good,
    Great,
    Excellent,
    Amazing,
}

impl QualityTier {
    /// All tiers, worst first
    pub const ALL: [QualityTier; 6] = [
        QualityTier::Poor,
        QualityTier::Average,
        QualityTier::Good,
        QualityTier::Great,
        QualityTier::Excellent,
        QualityTier::Amazing,
    ];

    /// Map a quality score to its tier
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => QualityTier::Amazing,
            80..=89 => QualityTier::Excellent,
            70..=79 => QualityTier::Great,
            50..=69 => QualityTier::Good,
            30..=49 => QualityTier::Average,
            _ => QualityTier::Poor,
        }
    }

    /// Cash paid for one tray of this tier on liquidation
    pub fn tray_value(&self) -> u64 {
        match self {
            QualityTier::Amazing => 50,
            QualityTier::Excellent => 40,
            QualityTier::Great => 30,
            QualityTier::Good => 20,
            QualityTier::Average => 15,
            QualityTier::Poor => 10,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QualityTier::Amazing => "Amazing",
            QualityTier::Excellent => "Excellent",
            QualityTier::Great => "Great",
            QualityTier::Good => "Good",
            QualityTier::Average => "Average",
            QualityTier::Poor => "Poor",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            QualityTier::Amazing => "🏆",
            QualityTier::Excellent => "🥇",
            QualityTier::Great => "🥈",
            QualityTier::Good => "🥉",
            QualityTier::Average => "📋",
            QualityTier::Poor => "📄",
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One tray earned by a successful cook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrayRecord {
    pub quality: QualityTier,
    pub score: u32,
    /// Unix milliseconds, unique across trays
    pub timestamp: i64,
    #[serde(default)]
    pub game_number: u64,
}

/// A failed cook (never earns trays)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedCook {
    pub score: u32,
    #[serde(default)]
    pub reason: Option<String>,
    /// Unix milliseconds
    pub timestamp: i64,
    #[serde(default)]
    pub game_number: u64,
}

/// Result of recording one finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Failed {
        reason: Option<String>,
        score: u32,
        reward_units: u32,
    },
    Succeeded {
        reward_units: u32,
        quality: QualityTier,
        new_best_score: bool,
    },
}

impl Outcome {
    pub fn reward_units(&self) -> u32 {
        match self {
            Outcome::Failed { reward_units, .. } | Outcome::Succeeded { reward_units, .. } => {
                *reward_units
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// Result of selling every tray
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liquidation {
    /// Cash earned by this sale
    pub amount: u64,
    pub trays_sold: usize,
    /// Cash balance after the sale
    pub cash_balance: u64,
}

/// A mutation result plus whether it reached the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recorded<T> {
    #[serde(flatten)]
    pub value: T,
    /// False when the write failed; the in-memory ledger still holds the change
    pub persisted: bool,
}

/// Derived ledger statistics for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_trays: u64,
    pub total_games: u64,
    pub total_failures: u64,
    pub successful_games: u64,
    /// Percent of games that did not fail, rounded
    pub success_rate: u32,
    pub best_score: u32,
    /// Mean tray score, rounded
    pub average_score: u32,
    pub quality_counts: BTreeMap<QualityTier, u64>,
    pub failure_reasons: BTreeMap<String, u64>,
    pub cash: u64,
}

/// Merged tray/failure feed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityEntry {
    Success(TrayRecord),
    Failure(FailedCook),
}

impl ActivityEntry {
    pub fn timestamp(&self) -> i64 {
        match self {
            ActivityEntry::Success(tray) => tray.timestamp,
            ActivityEntry::Failure(cook) => cook.timestamp,
        }
    }

    pub fn score(&self) -> u32 {
        match self {
            ActivityEntry::Success(tray) => tray.score,
            ActivityEntry::Failure(cook) => cook.score,
        }
    }

    /// Tier name, or "Failed"
    pub fn label(&self) -> &'static str {
        match self {
            ActivityEntry::Success(tray) => tray.quality.name(),
            ActivityEntry::Failure(_) => "Failed",
        }
    }
}
