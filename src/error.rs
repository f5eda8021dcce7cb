//! Error types for config loading and ledger persistence.
//!
//! None of these are fatal: the ledger recovers from read problems and keeps
//! its in-memory aggregate authoritative after write problems.

use std::path::PathBuf;

/// Errors from the ledger and its store.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger read failed: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger write failed: {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored ledger is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("Stored ledger is not a JSON object")]
    NotAnObject,

    #[error("Stored ledger schema version {0} is newer than supported")]
    UnsupportedSchema(u32),

    #[error("Import rejected: {0}")]
    InvalidImport(String),

    #[error("Ledger serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Ledger store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from loading or validating a [`GameConfig`](crate::types::GameConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config read failed: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config malformed: {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}
