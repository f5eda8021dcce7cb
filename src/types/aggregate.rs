//! Persisted ledger aggregate and its schema migration
//!
//! Stored as one JSON object with camelCase keys. Blobs written before
//! `schemaVersion` existed are version 0 and load through the same
//! default-fill step as current ones.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LedgerError;
use crate::types::{FailedCook, TrayRecord};

/// Current on-disk schema version
pub const LEDGER_SCHEMA_VERSION: u32 = 1;

/// Everything the ledger persists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerAggregate {
    pub schema_version: u32,
    pub trays: Vec<TrayRecord>,
    pub failed_cooks: Vec<FailedCook>,
    pub total_games: u64,
    pub total_failures: u64,
    pub best_score: u32,
    pub total_trays: u64,
    pub cash: u64,
}

impl Default for LedgerAggregate {
    fn default() -> Self {
        Self {
            schema_version: LEDGER_SCHEMA_VERSION,
            trays: Vec::new(),
            failed_cooks: Vec::new(),
            total_games: 0,
            total_failures: 0,
            best_score: 0,
            total_trays: 0,
            cash: 0,
        }
    }
}

/// Result of loading a stored blob
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub aggregate: LedgerAggregate,
    /// Version found in the blob (0 for legacy)
    pub from_version: u32,
    /// Fields that were missing, mistyped or partly unreadable
    pub repaired: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Array,
    Count,
    Score,
}

const FIELDS: [(&str, Kind); 7] = [
    ("trays", Kind::Array),
    ("failedCooks", Kind::Array),
    ("totalGames", Kind::Count),
    ("totalFailures", Kind::Count),
    ("bestScore", Kind::Score),
    ("totalTrays", Kind::Count),
    ("cash", Kind::Count),
];

impl Kind {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            Kind::Array => value.is_array(),
            Kind::Count => value.is_u64(),
            Kind::Score => value.as_u64().is_some_and(|v| v <= u32::MAX as u64),
        }
    }
}

impl LedgerAggregate {
    /// Parse a stored blob and bring it to the current schema
    pub fn from_stored(raw: &str) -> Result<Migration, LedgerError> {
        let value: Value = serde_json::from_str(raw).map_err(LedgerError::Corrupt)?;
        Self::migrate(value)
    }

    /// Fill defaults for every managed field that is missing or mistyped,
    /// drop unreadable records, and stamp the current version
    pub fn migrate(value: Value) -> Result<Migration, LedgerError> {
        let Value::Object(mut map) = value else {
            return Err(LedgerError::NotAnObject);
        };

        let from_version = match map.get("schemaVersion").and_then(Value::as_u64) {
            Some(v) if v > LEDGER_SCHEMA_VERSION as u64 => {
                return Err(LedgerError::UnsupportedSchema(v.min(u32::MAX as u64) as u32));
            }
            Some(v) => v as u32,
            None => 0,
        };

        let mut repaired = Vec::new();
        for (key, kind) in FIELDS {
            match map.get(key) {
                Some(v) if kind.accepts(v) => {}
                Some(_) => {
                    map.remove(key);
                    repaired.push(key.to_string());
                }
                None => repaired.push(key.to_string()),
            }
        }

        let trays: Vec<TrayRecord> = take_records(&mut map, "trays", &mut repaired);
        let failed_cooks: Vec<FailedCook> = take_records(&mut map, "failedCooks", &mut repaired);

        // The counter always matches the trays actually held; legacy blobs
        // may predate it and dropped records may leave it stale
        let held = trays.len() as u64;
        match map.get("totalTrays").and_then(Value::as_u64) {
            Some(count) if count == held => {}
            stored => {
                map.insert("totalTrays".to_string(), Value::from(held));
                if stored.is_some() {
                    repaired.push("totalTrays".to_string());
                }
            }
        }

        map.insert("schemaVersion".to_string(), Value::from(LEDGER_SCHEMA_VERSION));
        let mut aggregate: LedgerAggregate =
            serde_json::from_value(Value::Object(map)).map_err(LedgerError::Corrupt)?;
        aggregate.trays = trays;
        aggregate.failed_cooks = failed_cooks;

        repaired.dedup();
        Ok(Migration {
            aggregate,
            from_version,
            repaired,
        })
    }

    /// Serialize for the store
    pub fn to_stored(&self) -> Result<String, LedgerError> {
        serde_json::to_string(self).map_err(LedgerError::Serialize)
    }
}

/// Pull an array field out of the map, keeping only records that parse
fn take_records<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    key: &str,
    repaired: &mut Vec<String>,
) -> Vec<T> {
    let Some(Value::Array(items)) = map.remove(key) else {
        return Vec::new();
    };
    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if records.len() != total {
        repaired.push(key.to_string());
    }
    records
}

// =============================================================================
// TESTS
// =============================================================================
