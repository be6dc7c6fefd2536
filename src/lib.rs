//! # Point Enhancer - tiering, quota and caching engine
//!
//! Enhances raw building-automation point identifiers into human-readable
//! display names and equipment classifications, routing every point to the
//! cheapest strategy that still meets the quality bar:
//!
//! 1. **Cache**: a previous result recorded above the trust floor
//! 2. **Rules**: deterministic expansion when metadata is rich enough
//! 3. **AI**: budget-limited assistance for points that need it
//! 4. **Fallback**: degraded best-effort output when both confidence and
//!    budget are poor
//!
//! The shared daily budget is enforced by [`QuotaManager`] (never exceeded,
//! even under concurrent batches), and results live in [`TieredCache`] with
//! confidence-dependent expiration. The actual rule corpus and AI backend are
//! external collaborators behind the [`RuleBasedEnhancer`] and [`AiEnhancer`]
//! traits.

pub mod cache;
pub mod confidence;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod quota;
pub mod selector;
pub mod types;

pub use cache::{CacheBacking, CacheEntry, CacheProbe, CacheStats, CacheTier, SqliteBacking, TieredCache};
pub use error::{EnhancerError, Result};
pub use metrics::{EnhancementMetrics, MetricsSink};
pub use orchestrator::{
    AiEnhancer, BatchOutcome, EnhancementOrchestrator, OrchestratorConfig, RuleBasedEnhancer,
};
pub use quota::{
    QuotaConfig, QuotaManager, QuotaObserver, QuotaResetScheduler, QuotaSnapshot, QuotaState,
    ResetSchedulerConfig,
};
pub use selector::{select_tier, EnhancementTier, TierDecision};
pub use types::{now_ms, EnhancedPoint, Enhancement, Point, TagPayload};
