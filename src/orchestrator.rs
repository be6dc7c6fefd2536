//! # Enhancement Orchestrator
//!
//! Drives a batch of points through the tiering pipeline: probe the cache,
//! select a tier, dispatch to the matching collaborator, commit the quota
//! cost, write the result back to the cache, and aggregate metrics.
//!
//! # Concurrency
//! Points run concurrently as tokio tasks bounded by an in-flight cap; no
//! ordering is guaranteed between points. Within one point the ordering is
//! strict: the cache probe and quota snapshot are read at the start of that
//! point's processing, and the quota consume happens before the AI call is
//! issued — a point is never charged for a call it did not make and never
//! makes an AI call it could not afford.
//!
//! # Failure containment
//! A single point's collaborator failure is caught, counted, and the point
//! omitted from the output; the rest of the batch is unaffected. Quota
//! charged for an AI call that later fails stays charged.

use crate::cache::TieredCache;
use crate::confidence;
use crate::error::Result;
use crate::metrics::{EnhancementMetrics, MetricsSink};
use crate::quota::QuotaManager;
use crate::selector::{self, EnhancementTier};
use crate::types::{EnhancedPoint, Enhancement, Point};
use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

// ================================================================================================
// COLLABORATOR SEAMS
// ================================================================================================

/// Deterministic rule-based enhancer collaborator.
///
/// Expands abbreviations and classifies equipment from the rule corpus.
/// Must never consume quota.
pub trait RuleBasedEnhancer: Send + Sync {
    /// Enhance one point from deterministic rules.
    fn enhance(&self, point: &Point) -> Result<Enhancement>;
}

/// AI-assisted enhancer collaborator.
///
/// May fail or time out; the cost of a call is fixed by the tier selector's
/// policy table, not reported by this collaborator.
#[async_trait]
pub trait AiEnhancer: Send + Sync {
    /// Enhance one point with AI assistance.
    async fn enhance(&self, point: &Point) -> Result<Enhancement>;
}

// ================================================================================================
// CONFIGURATION & RESULTS
// ================================================================================================

/// Configuration for batch processing.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum points processed concurrently within one batch
    pub max_in_flight: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { max_in_flight: 64 }
    }
}

/// Result of one batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Successfully enhanced points, in completion order
    pub enhanced: Vec<EnhancedPoint>,

    /// Counters for this batch only
    pub metrics: EnhancementMetrics,

    /// Quota units consumed by this batch (charged at dispatch)
    pub quota_used: u64,
}

/// What one point's pipeline produced.
struct PointOutcome {
    enhanced: Option<EnhancedPoint>,
    kind: PathKind,
    quota_spent: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PathKind {
    CacheHit,
    RuleBased,
    Ai,
    Failed,
}

// ================================================================================================
// ORCHESTRATOR
// ================================================================================================

/// Batch pipeline over one shared budget scope and one shared cache.
pub struct EnhancementOrchestrator {
    quota: Arc<QuotaManager>,
    cache: Arc<TieredCache>,
    rules: Arc<dyn RuleBasedEnhancer>,
    ai: Arc<dyn AiEnhancer>,
    sink: Option<Arc<dyn MetricsSink>>,
    config: OrchestratorConfig,
    /// Counters accumulated across batches; reset only by explicit caller action
    totals: RwLock<EnhancementMetrics>,
}

impl EnhancementOrchestrator {
    /// Create an orchestrator over shared quota/cache state and the two
    /// collaborator implementations.
    pub fn new(
        quota: Arc<QuotaManager>,
        cache: Arc<TieredCache>,
        rules: Arc<dyn RuleBasedEnhancer>,
        ai: Arc<dyn AiEnhancer>,
        config: OrchestratorConfig,
    ) -> Self {
        EnhancementOrchestrator {
            quota,
            cache,
            rules,
            ai,
            sink: None,
            config,
            totals: RwLock::new(EnhancementMetrics::default()),
        }
    }

    /// Attach a metrics sink that receives each batch's counters.
    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Counters accumulated across every batch since the last reset.
    pub fn metrics_totals(&self) -> EnhancementMetrics {
        *self.totals.read()
    }

    /// Zero the accumulated counters.
    pub fn reset_metrics(&self) {
        *self.totals.write() = EnhancementMetrics::default();
    }

    /// Enhance a batch of points.
    ///
    /// Results complete in arbitrary order; callers must not assume batch
    /// order is preserved. An empty batch returns an empty outcome. Failed
    /// points are counted in `metrics.errors` and omitted from `enhanced`.
    pub async fn enhance_batch(&self, points: Vec<Point>) -> BatchOutcome {
        let batch_id = Uuid::new_v4();
        let total = points.len();
        info!("batch {}: enhancing {} points", batch_id, total);

        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));
        let mut tasks = JoinSet::new();

        for point in points {
            let semaphore = Arc::clone(&semaphore);
            let quota = Arc::clone(&self.quota);
            let cache = Arc::clone(&self.cache);
            let rules = Arc::clone(&self.rules);
            let ai = Arc::clone(&self.ai);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                enhance_point(quota, cache, rules, ai, point).await
            });
        }

        let mut metrics = EnhancementMetrics {
            total_requests: total as u64,
            ..Default::default()
        };
        let mut enhanced = Vec::with_capacity(total);
        let mut quota_used = 0u64;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    quota_used += outcome.quota_spent;
                    match outcome.kind {
                        PathKind::CacheHit => metrics.cache_hits += 1,
                        PathKind::RuleBased => metrics.rule_based += 1,
                        PathKind::Ai => metrics.ai_enhancements += 1,
                        PathKind::Failed => metrics.errors += 1,
                    }
                    if let Some(point) = outcome.enhanced {
                        enhanced.push(point);
                    }
                }
                Err(e) => {
                    warn!("batch {}: point task panicked: {}", batch_id, e);
                    metrics.errors += 1;
                }
            }
        }

        self.totals.write().merge(&metrics);
        if let Some(sink) = &self.sink {
            sink.record(&metrics);
        }

        info!(
            "batch {}: done, {} enhanced ({} cache, {} rules, {} ai, {} errors), {} quota units",
            batch_id,
            enhanced.len(),
            metrics.cache_hits,
            metrics.rule_based,
            metrics.ai_enhancements,
            metrics.errors,
            quota_used
        );

        BatchOutcome {
            enhanced,
            metrics,
            quota_used,
        }
    }
}

// ================================================================================================
// PER-POINT PIPELINE
// ================================================================================================

/// Run one point through probe → select → dispatch → cache write.
async fn enhance_point(
    quota: Arc<QuotaManager>,
    cache: Arc<TieredCache>,
    rules: Arc<dyn RuleBasedEnhancer>,
    ai: Arc<dyn AiEnhancer>,
    point: Point,
) -> PointOutcome {
    let probe = cache.probe(&point.name);
    let snapshot = quota.snapshot();
    let decision = selector::select_tier(&point, probe.as_ref(), &snapshot);
    debug!(
        "point {}: tier {:?}, impact {} ({})",
        point.name, decision.tier, decision.quota_impact, decision.reason
    );

    match decision.tier {
        EnhancementTier::Cache => {
            if let Some(data) = cache.get(&point.name) {
                return PointOutcome {
                    enhanced: Some(EnhancedPoint {
                        name: point.name,
                        enhancement: data,
                        tier: EnhancementTier::Cache,
                    }),
                    kind: PathKind::CacheHit,
                    quota_spent: 0,
                };
            }
            // Entry expired between probe and get: degrade to rules at the
            // freshly scored confidence, not the stale recorded one.
            let confidence = confidence::score(&point);
            run_rules(
                rules.as_ref(),
                &cache,
                &point,
                confidence,
                EnhancementTier::Fallback,
                0,
            )
        }

        EnhancementTier::RuleBasedHigh
        | EnhancementTier::RuleBasedMedium
        | EnhancementTier::Fallback => run_rules(
            rules.as_ref(),
            &cache,
            &point,
            decision.confidence,
            decision.tier,
            0,
        ),

        EnhancementTier::Ai => {
            // Consume strictly before dispatching: the call is only issued
            // once the budget is committed.
            if !quota.consume(decision.quota_impact) {
                debug!(
                    "point {}: budget raced to empty, degrading to rules",
                    point.name
                );
                return run_rules(
                    rules.as_ref(),
                    &cache,
                    &point,
                    decision.confidence,
                    EnhancementTier::Fallback,
                    0,
                );
            }

            match ai.enhance(&point).await {
                Ok(result) => {
                    cache.set(point.name.clone(), result.clone(), result.confidence);
                    PointOutcome {
                        enhanced: Some(EnhancedPoint {
                            name: point.name,
                            enhancement: result,
                            tier: EnhancementTier::Ai,
                        }),
                        kind: PathKind::Ai,
                        quota_spent: decision.quota_impact,
                    }
                }
                Err(e) => {
                    // Charged at dispatch; the spent quota is not refunded.
                    warn!("point {}: ai enhancer failed: {}", point.name, e);
                    PointOutcome {
                        enhanced: None,
                        kind: PathKind::Failed,
                        quota_spent: decision.quota_impact,
                    }
                }
            }
        }
    }
}

/// Run the rule-based collaborator and cache its output at `confidence`.
fn run_rules(
    rules: &dyn RuleBasedEnhancer,
    cache: &TieredCache,
    point: &Point,
    confidence: u8,
    served_tier: EnhancementTier,
    quota_spent: u64,
) -> PointOutcome {
    match rules.enhance(point) {
        Ok(result) => {
            cache.set(point.name.clone(), result.clone(), confidence);
            PointOutcome {
                enhanced: Some(EnhancedPoint {
                    name: point.name.clone(),
                    enhancement: result,
                    tier: served_tier,
                }),
                kind: PathKind::RuleBased,
                quota_spent,
            }
        }
        Err(e) => {
            warn!("point {}: rule engine failed: {}", point.name, e);
            PointOutcome {
                enhanced: None,
                kind: PathKind::Failed,
                quota_spent,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnhancerError;
    use crate::quota::QuotaConfig;

    struct FixedRules;

    impl RuleBasedEnhancer for FixedRules {
        fn enhance(&self, point: &Point) -> Result<Enhancement> {
            Ok(Enhancement {
                display_name: format!("Rule: {}", point.name),
                equipment_type: "Unknown".to_string(),
                confidence: 60,
            })
        }
    }

    struct FixedAi;

    #[async_trait]
    impl AiEnhancer for FixedAi {
        async fn enhance(&self, point: &Point) -> Result<Enhancement> {
            Ok(Enhancement {
                display_name: format!("AI: {}", point.name),
                equipment_type: "VAV".to_string(),
                confidence: 95,
            })
        }
    }

    struct BrokenAi;

    #[async_trait]
    impl AiEnhancer for BrokenAi {
        async fn enhance(&self, point: &Point) -> Result<Enhancement> {
            Err(EnhancerError::ai_enhancer(&point.name, "model timeout"))
        }
    }

    fn orchestrator(ai: Arc<dyn AiEnhancer>) -> EnhancementOrchestrator {
        EnhancementOrchestrator::new(
            Arc::new(QuotaManager::new(QuotaConfig::default())),
            Arc::new(TieredCache::new()),
            Arc::new(FixedRules),
            ai,
            OrchestratorConfig::default(),
        )
    }

    #[test]
    fn test_config_defaults() {
        assert_eq!(OrchestratorConfig::default().max_in_flight, 64);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let orchestrator = orchestrator(Arc::new(FixedAi));
        let outcome = orchestrator.enhance_batch(Vec::new()).await;

        assert!(outcome.enhanced.is_empty());
        assert_eq!(outcome.metrics.total_requests, 0);
        assert_eq!(outcome.quota_used, 0);
    }

    #[tokio::test]
    async fn test_ai_failure_does_not_abort_batch() {
        let orchestrator = orchestrator(Arc::new(BrokenAi));

        // Sparse points route to AI; the broken AI drops them.
        let mut sparse = Point::named("sparse-1");
        sparse.marker_tags = Some("sensor".to_string());

        let rich = Point {
            name: "ahu-1".to_string(),
            marker_tags: Some("supply air".to_string()),
            kv_tags: Some(r#"{"equip": "ahu"}"#.to_string()),
            bacnet_data: Some(r#"{"device_name": "AHU-1", "object_name": "SA-T"}"#.to_string()),
            collect_enabled: true,
        };

        let outcome = orchestrator.enhance_batch(vec![sparse, rich]).await;

        assert_eq!(outcome.metrics.errors, 1);
        assert_eq!(outcome.metrics.rule_based, 1);
        assert_eq!(outcome.enhanced.len(), 1, "the rule-served point must survive");
        assert_eq!(outcome.quota_used, 50, "ai cost stays charged on failure");
    }

    #[tokio::test]
    async fn test_cumulative_metrics_and_reset() {
        let orchestrator = orchestrator(Arc::new(FixedAi));
        let point = Point::named("p1");

        orchestrator.enhance_batch(vec![point.clone()]).await;
        orchestrator.enhance_batch(vec![point]).await;

        assert_eq!(orchestrator.metrics_totals().total_requests, 2);

        orchestrator.reset_metrics();
        assert_eq!(orchestrator.metrics_totals(), EnhancementMetrics::default());
    }
}
