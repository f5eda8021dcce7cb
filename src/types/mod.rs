//! Core types for Sweetspot

mod status;
mod reason;
mod output;
mod history;
mod config;
mod reward;
mod aggregate;

pub use status::{SessionStatus, Direction};
pub use reason::ReasonCode;
pub use output::TickOutput;
pub use history::{HistoryWindow, Sample};
pub use config::GameConfig;
pub(crate) use config::ordered;
pub use reward::{
    QualityTier, TrayRecord, FailedCook, Outcome, Liquidation, Recorded, LedgerStats, ActivityEntry,
};
pub use aggregate::{LedgerAggregate, Migration, LEDGER_SCHEMA_VERSION};
