//! Daily budget management for AI-assisted enhancement.
//!
//! One `QuotaManager` per budget scope, shared by every batch in flight.
//! Consumption is a single critical section; warning and hard-stop
//! notifications go to registered observers. The companion scheduler rolls
//! the budget over every 24 hours.

pub mod manager;
pub mod scheduler;
pub mod types;

pub use manager::{
    QuotaManager, QuotaObserver, AI_ASSIST_COST, AI_FULL_COST, HARD_STOP_THRESHOLD_PCT,
    RESET_INTERVAL_MS, WARNING_THRESHOLD_PCT,
};
pub use scheduler::{QuotaResetScheduler, ResetSchedulerConfig};
pub use types::{QuotaConfig, QuotaSnapshot, QuotaState};
