//! Scheduled quota reset - background task for the daily budget rollover.
//!
//! The quota manager itself never self-schedules: it only reports that a
//! reset is due. This scheduler is the in-process convenience for deployments
//! without an external cron, polling `should_reset()` on a short interval and
//! invoking `reset()` when the 24-hour window has elapsed.
//!
//! Polling rather than sleeping 24h keeps the rollover correct across
//! restarts: a process that comes up 23 hours into the window resets one
//! hour later, not a day later.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::quota::manager::QuotaManager;
use crate::types::now_ms;
use log::{debug, info};

/// Configuration for the scheduled quota reset.
#[derive(Debug, Clone)]
pub struct ResetSchedulerConfig {
    /// How often to poll for a due reset
    pub check_interval: Duration,
    /// Whether the scheduler is enabled
    pub enabled: bool,
}

impl Default for ResetSchedulerConfig {
    fn default() -> Self {
        Self {
            // 5-minute polling bounds reset lag without measurable overhead
            check_interval: Duration::from_secs(5 * 60),
            enabled: true,
        }
    }
}

/// Background task that rolls the daily budget over.
///
/// Spawned once during application startup and left running for the process
/// lifetime.
pub struct QuotaResetScheduler {
    /// The budget scope this scheduler rolls over
    quota: Arc<QuotaManager>,
    /// Scheduler configuration
    config: ResetSchedulerConfig,
    /// Timestamp of the last reset this scheduler performed
    last_reset_at: Arc<RwLock<Option<u64>>>,
}

impl QuotaResetScheduler {
    /// Creates a new reset scheduler for a budget scope.
    pub fn new(quota: Arc<QuotaManager>, config: ResetSchedulerConfig) -> Self {
        Self {
            quota,
            config,
            last_reset_at: Arc::new(RwLock::new(None)),
        }
    }

    /// Timestamp of the last reset performed by this scheduler, if any.
    pub fn last_reset(&self) -> Option<u64> {
        *self.last_reset_at.read()
    }

    /// Starts the scheduler loop.
    ///
    /// Runs indefinitely and should be spawned as a tokio task:
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use enhancer::{QuotaManager, QuotaConfig, QuotaResetScheduler, ResetSchedulerConfig};
    /// let quota = Arc::new(QuotaManager::new(QuotaConfig::default()));
    /// let scheduler = Arc::new(QuotaResetScheduler::new(
    ///     Arc::clone(&quota),
    ///     ResetSchedulerConfig::default(),
    /// ));
    /// tokio::spawn(async move {
    ///     scheduler.start().await;
    /// });
    /// ```
    ///
    /// Returns immediately when disabled in config.
    pub async fn start(self: Arc<Self>) {
        if !self.config.enabled {
            info!("quota reset scheduler is disabled, skipping");
            return;
        }

        info!(
            "starting quota reset scheduler with {}-second check interval",
            self.config.check_interval.as_secs()
        );

        let mut ticker = interval(self.config.check_interval);

        loop {
            ticker.tick().await;
            self.check_and_reset();
        }
    }

    /// Executes one poll cycle: reset the budget if the window has elapsed.
    fn check_and_reset(&self) {
        if !self.quota.should_reset() {
            debug!("quota reset not due yet");
            return;
        }

        self.quota.reset();
        *self.last_reset_at.write() = Some(now_ms());
        info!("daily quota reset performed");
    }
}
