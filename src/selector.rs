//! # Tier Selector
//!
//! Routes one point to the cheapest enhancement path that still meets the
//! quality bar. Pure with respect to its arguments: given the same point,
//! cache probe and quota snapshot it always returns the same decision, even
//! though those arguments are read from mutable shared state.
//!
//! Cheap paths win whenever they clear the confidence bar; AI is reserved
//! for points that genuinely need it and only while the budget has headroom;
//! the degraded fallback guarantees every point still gets some output.

use crate::cache::CacheProbe;
use crate::confidence;
use crate::quota::{QuotaManager, QuotaSnapshot};
use crate::types::Point;
use serde::{Deserialize, Serialize};

/// Routing decision for one point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnhancementTier {
    /// Serve the cached result unchanged
    Cache,
    /// Deterministic rules, high confidence
    RuleBasedHigh,
    /// Deterministic rules chosen to conserve quota
    RuleBasedMedium,
    /// AI-assisted enhancement, costs quota
    Ai,
    /// Degraded best-effort output
    Fallback,
}

/// A cached entry is only served when it was recorded above this confidence.
pub const CACHE_CONFIDENCE_FLOOR: u8 = 80;

/// Above this score, deterministic rules alone are trusted.
pub const RULE_HIGH_THRESHOLD: u8 = 85;

/// At or above this score, rules are an acceptable quota-conserving substitute.
pub const RULE_MEDIUM_FLOOR: u8 = 70;

/// AI paths are only taken while usage stays under this percentage.
pub const QUOTA_HEADROOM_PCT: f64 = 80.0;

/// A full AI pass additionally requires this much remaining budget.
pub const FULL_AI_MIN_REMAINING: i64 = 100;

/// The selected path for one point, with the quota cost it implies.
#[derive(Clone, Debug)]
pub struct TierDecision {
    /// Selected routing tier
    pub tier: EnhancementTier,

    /// The confidence the decision was based on (recorded confidence for
    /// cache hits, freshly computed score otherwise)
    pub confidence: u8,

    /// Short explanation for logs and diagnostics
    pub reason: String,

    /// Cost the orchestrator must consume before dispatching this path
    pub quota_impact: u64,
}

/// Decide the enhancement path for one point.
///
/// `cached` is the cache probe taken at the start of this point's processing
/// and `quota` the budget snapshot from the same instant; the decision is a
/// pure function of the three.
pub fn select_tier(
    point: &Point,
    cached: Option<&CacheProbe>,
    quota: &QuotaSnapshot,
) -> TierDecision {
    if let Some(probe) = cached {
        if probe.confidence > CACHE_CONFIDENCE_FLOOR {
            return TierDecision {
                tier: EnhancementTier::Cache,
                confidence: probe.confidence,
                reason: format!("live cached entry at confidence {}", probe.confidence),
                quota_impact: 0,
            };
        }
    }

    let confidence = confidence::score(point);

    if confidence > RULE_HIGH_THRESHOLD {
        return TierDecision {
            tier: EnhancementTier::RuleBasedHigh,
            confidence,
            reason: format!("metadata rich enough for rules alone ({})", confidence),
            quota_impact: 0,
        };
    }

    if confidence >= RULE_MEDIUM_FLOOR {
        if quota.usage_percentage < QUOTA_HEADROOM_PCT {
            return TierDecision {
                tier: EnhancementTier::Ai,
                confidence,
                reason: format!("ai assist within budget headroom ({})", confidence),
                quota_impact: QuotaManager::estimate_cost(confidence),
            };
        }
        return TierDecision {
            tier: EnhancementTier::RuleBasedMedium,
            confidence,
            reason: "quota conservation".to_string(),
            quota_impact: 0,
        };
    }

    if quota.usage_percentage < QUOTA_HEADROOM_PCT && quota.available.max(0) > FULL_AI_MIN_REMAINING
    {
        return TierDecision {
            tier: EnhancementTier::Ai,
            confidence,
            reason: format!("sparse metadata needs full ai pass ({})", confidence),
            quota_impact: QuotaManager::estimate_cost(confidence),
        };
    }

    TierDecision {
        tier: EnhancementTier::Fallback,
        confidence,
        reason: "degraded fallback, low confidence and no budget".to_string(),
        quota_impact: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheTier;

    fn snapshot(usage_percentage: f64, available: i64) -> QuotaSnapshot {
        QuotaSnapshot {
            usage_percentage,
            available,
            hard_stopped: false,
        }
    }

    fn rich_point() -> Point {
        Point {
            name: "ahu-1/sa-temp".to_string(),
            marker_tags: Some("supply air temp sensor".to_string()),
            kv_tags: Some(r#"{"equip": "ahu"}"#.to_string()),
            bacnet_data: Some(r#"{"device_name": "AHU-1", "object_name": "SA-T"}"#.to_string()),
            collect_enabled: false,
        }
    }

    fn sparse_point() -> Point {
        let mut point = Point::named("unk-pt-9");
        point.marker_tags = Some("sensor".to_string());
        point
    }

    #[test]
    fn test_trusted_cache_entry_short_circuits() {
        let probe = CacheProbe {
            tier: CacheTier::Tier1,
            confidence: 92,
        };
        let decision = select_tier(&rich_point(), Some(&probe), &snapshot(99.0, 0));

        assert_eq!(decision.tier, EnhancementTier::Cache);
        assert_eq!(decision.quota_impact, 0);
        assert_eq!(decision.confidence, 92);
    }

    #[test]
    fn test_low_confidence_cache_entry_is_ignored() {
        let probe = CacheProbe {
            tier: CacheTier::Tier2,
            confidence: 80,
        };
        // Recorded confidence of exactly 80 does not clear the `> 80` bar.
        let decision = select_tier(&rich_point(), Some(&probe), &snapshot(0.0, 950));
        assert_ne!(decision.tier, EnhancementTier::Cache);
    }

    #[test]
    fn test_rich_metadata_routes_to_rules() {
        // marker + kv + device identity: 50+15+20+10+5 = 100
        let decision = select_tier(&rich_point(), None, &snapshot(0.0, 950));
        assert_eq!(decision.tier, EnhancementTier::RuleBasedHigh);
        assert_eq!(decision.quota_impact, 0);
        assert!(decision.confidence >= 85);
    }

    #[test]
    fn test_sparse_point_gets_full_ai_with_headroom() {
        // marker tags only: 65
        let decision = select_tier(&sparse_point(), None, &snapshot(50.0, 450));
        assert_eq!(decision.tier, EnhancementTier::Ai);
        assert_eq!(decision.quota_impact, 50);
    }

    #[test]
    fn test_sparse_point_falls_back_when_budget_tight() {
        let decision = select_tier(&sparse_point(), None, &snapshot(85.0, 100));
        assert_eq!(decision.tier, EnhancementTier::Fallback);
        assert_eq!(decision.quota_impact, 0);
    }

    #[test]
    fn test_sparse_point_falls_back_on_thin_remaining_budget() {
        // Headroom ok but remaining budget at the floor: full AI needs > 100.
        let decision = select_tier(&sparse_point(), None, &snapshot(50.0, 100));
        assert_eq!(decision.tier, EnhancementTier::Fallback);
    }

    #[test]
    fn test_mid_confidence_prefers_ai_then_conserves() {
        let mut point = sparse_point();
        point.kv_tags = Some(r#"{"equip": "vav"}"#.to_string()); // 85

        let roomy = select_tier(&point, None, &snapshot(10.0, 900));
        assert_eq!(roomy.tier, EnhancementTier::Ai);
        assert_eq!(roomy.quota_impact, 20);

        let tight = select_tier(&point, None, &snapshot(80.0, 150));
        assert_eq!(tight.tier, EnhancementTier::RuleBasedMedium);
        assert_eq!(tight.quota_impact, 0);
    }

    #[test]
    fn test_decision_is_deterministic() {
        let point = sparse_point();
        let quota = snapshot(42.0, 500);

        let first = select_tier(&point, None, &quota);
        for _ in 0..10 {
            let again = select_tier(&point, None, &quota);
            assert_eq!(again.tier, first.tier);
            assert_eq!(again.confidence, first.confidence);
            assert_eq!(again.quota_impact, first.quota_impact);
        }
    }
}
