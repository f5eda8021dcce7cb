//! Core modules for Sweetspot

pub mod session;
pub mod feedback;
pub mod store;
pub mod ledger;
pub mod api;

pub use session::{Session, SessionOutcome};
pub use feedback::{FeedbackEngine, FeedbackSignal};
pub use store::{LedgerStore, FileStore, MemoryStore};
pub use ledger::{Ledger, quality_tier, reward_count};
pub use api::{create_router, run_server};
