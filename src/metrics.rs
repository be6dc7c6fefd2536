//! Enhancement metrics - per-batch counters and the external sink seam.

use serde::{Deserialize, Serialize};

/// Counters for one batch, or accumulated across batches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementMetrics {
    /// Points submitted
    pub total_requests: u64,
    /// Points served from cache
    pub cache_hits: u64,
    /// Points served by the rule engine (including degraded fallback)
    pub rule_based: u64,
    /// Points served by the AI collaborator
    pub ai_enhancements: u64,
    /// Points dropped after a collaborator failure
    pub errors: u64,
}

impl EnhancementMetrics {
    /// Fold another set of counters into this one.
    pub fn merge(&mut self, other: &EnhancementMetrics) {
        self.total_requests += other.total_requests;
        self.cache_hits += other.cache_hits;
        self.rule_based += other.rule_based;
        self.ai_enhancements += other.ai_enhancements;
        self.errors += other.errors;
    }

    /// Fraction of requests served from cache, as a percentage.
    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64 * 100.0
        }
    }

    /// Fraction of requests that failed, as a percentage.
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.errors as f64 / self.total_requests as f64 * 100.0
        }
    }
}

/// Receives a metrics snapshot after every batch.
///
/// Push-style: the orchestrator calls `record` once per completed batch with
/// that batch's counters. Implementations forward to dashboards or alerting.
pub trait MetricsSink: Send + Sync {
    /// Handle one batch's counters.
    fn record(&self, metrics: &EnhancementMetrics);
}
