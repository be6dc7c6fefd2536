//! Quota data structures.
//!
//! The budget state is a plain serializable struct so a deployment can
//! persist it across restarts and hand it back via `QuotaManager::from_state`.

use crate::types::now_ms;
use serde::{Deserialize, Serialize};

/// Default daily budget in enhancement-cost units.
pub const DEFAULT_DAILY_LIMIT: u64 = 1000;

/// Default fraction of the budget held back to absorb estimation error.
pub const DEFAULT_RESERVE_PERCENTAGE: u8 = 5;

/// Configuration for a budget scope.
#[derive(Clone, Debug)]
pub struct QuotaConfig {
    /// Daily budget in cost units
    pub daily_limit: u64,

    /// Percentage of the budget never made available
    pub reserve_percentage: u8,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        QuotaConfig {
            daily_limit: DEFAULT_DAILY_LIMIT,
            reserve_percentage: DEFAULT_RESERVE_PERCENTAGE,
        }
    }
}

/// Mutable state of one budget scope.
///
/// `used` only ever grows between resets; `reset` is the single operation
/// that zeroes it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuotaState {
    /// Daily budget in cost units
    pub daily_limit: u64,

    /// Units consumed since the last reset
    pub used: u64,

    /// Percentage of the budget never made available
    pub reserve_percentage: u8,

    /// When the budget was last reset (Unix epoch ms)
    pub last_reset_ms: u64,
}

impl QuotaState {
    /// Fresh state for a config, stamped with the current time.
    pub fn new(config: &QuotaConfig) -> Self {
        QuotaState {
            daily_limit: config.daily_limit,
            used: 0,
            reserve_percentage: config.reserve_percentage,
            last_reset_ms: now_ms(),
        }
    }
}

/// Read-only view of a budget scope at one instant.
///
/// This is what the tier selector consumes: the selector stays a pure
/// function of its inputs even though the underlying budget keeps moving.
#[derive(Clone, Copy, Debug)]
pub struct QuotaSnapshot {
    /// `used / daily_limit × 100`
    pub usage_percentage: f64,

    /// Units still available after the reserve holdback; may be negative
    /// for a restored overcommitted scope, treat as zero
    pub available: i64,

    /// Whether the hard-stop latch is engaged
    pub hard_stopped: bool,
}
