//! # Quota Manager
//!
//! Tracks a rolling daily budget of enhancement-cost units shared by every
//! point in flight. The check-availability-then-add sequence in `consume` is
//! a single critical section: under concurrent batches, two points can never
//! both pass the availability check and jointly overshoot the limit.
//!
//! Warning and hard-stop notifications go out through registered observers,
//! invoked strictly after the internal lock is released so a slow observer
//! cannot stall other consumers.

use crate::quota::types::{QuotaConfig, QuotaSnapshot, QuotaState};
use crate::types::now_ms;
use log::{info, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Usage percentage at which the warning notification fires.
pub const WARNING_THRESHOLD_PCT: f64 = 80.0;

/// Usage percentage at which the hard stop engages.
pub const HARD_STOP_THRESHOLD_PCT: f64 = 95.0;

/// A budget reset is due once this much time has passed since the last one.
pub const RESET_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;

/// Cost charged for an AI-assisted pass on a mid-confidence point.
pub const AI_ASSIST_COST: u64 = 20;

/// Cost charged for a full AI pass on a low-confidence point.
pub const AI_FULL_COST: u64 = 50;

/// Observer for budget threshold notifications.
///
/// Implementations must not assume they run inside any lock: they are called
/// after the quota critical section has ended, and a consume that triggered a
/// notification has already committed.
pub trait QuotaObserver: Send + Sync {
    /// Usage crossed into the warning band [80,95)
    fn on_warning(&self, usage_percentage: f64);

    /// Usage reached the hard-stop threshold; consumes now fail until reset
    fn on_hard_stop(&self, usage_percentage: f64);
}

/// Threshold event produced inside the critical section, delivered outside it.
enum ThresholdEvent {
    Warning(f64),
    HardStop(f64),
}

/// State guarded by the consume critical section.
struct QuotaInner {
    state: QuotaState,
    /// Latched once per crossing into the warning band; cleared on reset
    warning_notified: bool,
    /// Latched at the hard-stop threshold; cleared on reset
    hard_stopped: bool,
}

/// Shared daily budget manager for one budget scope.
pub struct QuotaManager {
    inner: Mutex<QuotaInner>,
    observers: RwLock<Vec<Arc<dyn QuotaObserver>>>,
}

impl std::fmt::Debug for QuotaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("QuotaManager")
            .field("daily_limit", &inner.state.daily_limit)
            .field("used", &inner.state.used)
            .field("hard_stopped", &inner.hard_stopped)
            .finish()
    }
}

impl QuotaManager {
    /// Create a manager with a fresh budget for the given config.
    pub fn new(config: QuotaConfig) -> Self {
        Self::from_state(QuotaState::new(&config))
    }

    /// Restore a manager from persisted state.
    ///
    /// The warning and hard-stop latches are re-derived from the restored
    /// usage so a process restart does not re-fire notifications that already
    /// went out, and does not forget an engaged hard stop.
    pub fn from_state(state: QuotaState) -> Self {
        let pct = usage_percentage_of(&state);
        QuotaManager {
            inner: Mutex::new(QuotaInner {
                warning_notified: pct >= WARNING_THRESHOLD_PCT,
                hard_stopped: pct >= HARD_STOP_THRESHOLD_PCT,
                state,
            }),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer for warning/hard-stop notifications.
    pub fn register_observer(&self, observer: Arc<dyn QuotaObserver>) {
        self.observers.write().push(observer);
    }

    // ============================================================================================
    // READ OPERATIONS
    // ============================================================================================

    /// Units still available after the reserve holdback.
    ///
    /// May be negative for a restored overcommitted scope; callers must treat
    /// negative as zero availability.
    pub fn available(&self) -> i64 {
        available_of(&self.inner.lock().state)
    }

    /// Fraction of the daily limit consumed, as a percentage.
    pub fn usage_percentage(&self) -> f64 {
        usage_percentage_of(&self.inner.lock().state)
    }

    /// One consistent read of the budget for a routing decision.
    pub fn snapshot(&self) -> QuotaSnapshot {
        let inner = self.inner.lock();
        QuotaSnapshot {
            usage_percentage: usage_percentage_of(&inner.state),
            available: available_of(&inner.state),
            hard_stopped: inner.hard_stopped,
        }
    }

    /// Copy of the raw state, e.g. for persistence.
    pub fn state(&self) -> QuotaState {
        self.inner.lock().state.clone()
    }

    /// Whether a reset is due (≥24h since the last one).
    ///
    /// Reset is never automatic; a scheduler is expected to poll this and
    /// invoke [`QuotaManager::reset`].
    pub fn should_reset(&self) -> bool {
        let inner = self.inner.lock();
        now_ms().saturating_sub(inner.state.last_reset_ms) >= RESET_INTERVAL_MS
    }

    /// Policy table: estimated cost of enhancing a point at this confidence.
    ///
    /// Consulted by the tier selector before committing to a path; this is
    /// not metering of an actual call.
    pub fn estimate_cost(confidence: u8) -> u64 {
        if confidence > 85 {
            0
        } else if confidence >= 70 {
            AI_ASSIST_COST
        } else {
            AI_FULL_COST
        }
    }

    // ============================================================================================
    // MUTATING OPERATIONS
    // ============================================================================================

    /// Try to consume `amount` units from the budget.
    ///
    /// Returns false and leaves state untouched when the hard stop is engaged
    /// or the amount exceeds current availability. Never panics; rejection is
    /// communicated only through the return value.
    pub fn consume(&self, amount: u64) -> bool {
        let event = {
            let mut inner = self.inner.lock();

            if inner.hard_stopped {
                return false;
            }

            if amount as i64 > available_of(&inner.state) {
                return false;
            }

            inner.state.used += amount;
            let pct = usage_percentage_of(&inner.state);

            if pct >= HARD_STOP_THRESHOLD_PCT {
                inner.hard_stopped = true;
                Some(ThresholdEvent::HardStop(pct))
            } else if pct >= WARNING_THRESHOLD_PCT && !inner.warning_notified {
                inner.warning_notified = true;
                Some(ThresholdEvent::Warning(pct))
            } else {
                None
            }
        };

        // Lock released; observer code cannot stall concurrent consumers.
        if let Some(event) = event {
            self.notify(event);
        }

        true
    }

    /// Zero the usage counter and stamp the reset time.
    ///
    /// Clears the warning and hard-stop latches; the limit and reserve are
    /// unchanged.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state.used = 0;
        inner.state.last_reset_ms = now_ms();
        inner.warning_notified = false;
        inner.hard_stopped = false;
        info!(
            "quota reset: daily_limit={} reserve={}%",
            inner.state.daily_limit, inner.state.reserve_percentage
        );
    }

    fn notify(&self, event: ThresholdEvent) {
        let observers = self.observers.read().clone();
        match event {
            ThresholdEvent::Warning(pct) => {
                warn!("quota usage entered warning band at {:.1}%", pct);
                for observer in &observers {
                    observer.on_warning(pct);
                }
            }
            ThresholdEvent::HardStop(pct) => {
                warn!("quota hard stop engaged at {:.1}%", pct);
                for observer in &observers {
                    observer.on_hard_stop(pct);
                }
            }
        }
    }
}

fn available_of(state: &QuotaState) -> i64 {
    let reserve = state.daily_limit * state.reserve_percentage as u64 / 100;
    state.daily_limit as i64 - state.used as i64 - reserve as i64
}

fn usage_percentage_of(state: &QuotaState) -> f64 {
    if state.daily_limit == 0 {
        return 0.0;
    }
    state.used as f64 / state.daily_limit as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(limit: u64, reserve: u8) -> QuotaManager {
        QuotaManager::new(QuotaConfig {
            daily_limit: limit,
            reserve_percentage: reserve,
        })
    }

    #[test]
    fn test_available_subtracts_reserve() {
        let quota = manager(1000, 5);
        assert_eq!(quota.available(), 950);

        assert!(quota.consume(100));
        assert_eq!(quota.available(), 850);
        assert!((quota.usage_percentage() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_consume_rejects_beyond_availability() {
        let quota = manager(100, 0);

        assert!(!quota.consume(101), "over-budget consume must be rejected");
        assert_eq!(quota.available(), 100, "rejected consume must not mutate state");

        assert!(quota.consume(100));
        assert!(!quota.consume(1));
    }

    #[test]
    fn test_estimate_cost_policy_table() {
        assert_eq!(QuotaManager::estimate_cost(100), 0);
        assert_eq!(QuotaManager::estimate_cost(86), 0);
        assert_eq!(QuotaManager::estimate_cost(85), 20);
        assert_eq!(QuotaManager::estimate_cost(70), 20);
        assert_eq!(QuotaManager::estimate_cost(69), 50);
        assert_eq!(QuotaManager::estimate_cost(0), 50);
    }

    #[test]
    fn test_snapshot_reads_consistently() {
        let quota = manager(1000, 5);
        quota.consume(500);

        let snap = quota.snapshot();
        assert!((snap.usage_percentage - 50.0).abs() < f64::EPSILON);
        assert_eq!(snap.available, 450);
        assert!(!snap.hard_stopped);
    }

    #[test]
    fn test_restored_state_rederives_latches() {
        let quota = QuotaManager::from_state(QuotaState {
            daily_limit: 100,
            used: 96,
            reserve_percentage: 0,
            last_reset_ms: now_ms(),
        });

        assert!(quota.snapshot().hard_stopped);
        assert!(!quota.consume(1), "restored hard stop must block consumes");
    }

    #[test]
    fn test_zero_limit_reports_zero_usage() {
        let quota = manager(0, 5);
        assert!((quota.usage_percentage() - 0.0).abs() < f64::EPSILON);
        assert!(!quota.consume(1));
    }
}
