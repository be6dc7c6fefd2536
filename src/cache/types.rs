//! Cache data structures.
//!
//! Tier assignment is a pure function of the confidence that produced an
//! entry and never changes for that entry's lifetime.

use crate::types::{now_ms, Enhancement};
use serde::{Deserialize, Serialize};

/// Expiration tiers, highest confidence first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheTier {
    /// Confidence > 90: trusted for 7 days
    Tier1,
    /// Confidence 80..=90: trusted for 1 day
    Tier2,
    /// Confidence 70..80: trusted for 1 hour
    Tier3,
    /// Confidence < 70: trusted for 5 minutes
    Tier4,
}

impl CacheTier {
    /// Tier for an entry created at this confidence.
    pub fn from_confidence(confidence: u8) -> Self {
        if confidence > 90 {
            CacheTier::Tier1
        } else if confidence >= 80 {
            CacheTier::Tier2
        } else if confidence >= 70 {
            CacheTier::Tier3
        } else {
            CacheTier::Tier4
        }
    }

    /// Time-to-live for entries in this tier, in seconds.
    pub fn ttl_secs(&self) -> u64 {
        match self {
            CacheTier::Tier1 => 7 * 24 * 60 * 60,
            CacheTier::Tier2 => 24 * 60 * 60,
            CacheTier::Tier3 => 60 * 60,
            CacheTier::Tier4 => 5 * 60,
        }
    }

    /// Stable numeric form for persistence.
    pub fn as_u8(&self) -> u8 {
        match self {
            CacheTier::Tier1 => 1,
            CacheTier::Tier2 => 2,
            CacheTier::Tier3 => 3,
            CacheTier::Tier4 => 4,
        }
    }

    /// Inverse of [`CacheTier::as_u8`].
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(CacheTier::Tier1),
            2 => Some(CacheTier::Tier2),
            3 => Some(CacheTier::Tier3),
            4 => Some(CacheTier::Tier4),
            _ => None,
        }
    }
}

/// One cached enhancement result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The enhancement result being cached
    pub data: Enhancement,

    /// Tier fixed at creation from `confidence`
    pub tier: CacheTier,

    /// The confidence that produced this entry
    pub confidence: u8,

    /// Creation time (Unix epoch ms)
    pub created_at_ms: u64,

    /// Tier-determined time-to-live in seconds
    pub ttl_secs: u64,

    /// Live lookups served by this entry
    pub hit_count: u64,
}

impl CacheEntry {
    /// Build a fresh entry, deriving tier and TTL from the confidence.
    pub fn new(data: Enhancement, confidence: u8) -> Self {
        let tier = CacheTier::from_confidence(confidence);
        CacheEntry {
            data,
            tier,
            confidence,
            created_at_ms: now_ms(),
            ttl_secs: tier.ttl_secs(),
            hit_count: 0,
        }
    }

    /// Whether the entry has outlived its TTL at the given instant.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) > self.ttl_secs * 1000
    }
}

/// A non-mutating view of a live entry, for routing decisions.
#[derive(Clone, Copy, Debug)]
pub struct CacheProbe {
    /// The entry's tier
    pub tier: CacheTier,
    /// The confidence recorded at creation
    pub confidence: u8,
}

/// Aggregate cache statistics.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Live + not-yet-evicted entries currently stored
    pub size: usize,
    /// Lookups served from a live entry
    pub hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
    /// `hits / (hits + misses) × 100`, or 0 with no lookups
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enhancement() -> Enhancement {
        Enhancement {
            display_name: "AHU-1 Supply Air Temp".to_string(),
            equipment_type: "AHU".to_string(),
            confidence: 95,
        }
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(CacheTier::from_confidence(91), CacheTier::Tier1);
        assert_eq!(CacheTier::from_confidence(90), CacheTier::Tier2);
        assert_eq!(CacheTier::from_confidence(80), CacheTier::Tier2);
        assert_eq!(CacheTier::from_confidence(79), CacheTier::Tier3);
        assert_eq!(CacheTier::from_confidence(70), CacheTier::Tier3);
        assert_eq!(CacheTier::from_confidence(69), CacheTier::Tier4);
    }

    #[test]
    fn test_tier_ttls() {
        assert_eq!(CacheTier::Tier1.ttl_secs(), 604_800);
        assert_eq!(CacheTier::Tier2.ttl_secs(), 86_400);
        assert_eq!(CacheTier::Tier3.ttl_secs(), 3_600);
        assert_eq!(CacheTier::Tier4.ttl_secs(), 300);
    }

    #[test]
    fn test_tier_numeric_round_trip() {
        for tier in [
            CacheTier::Tier1,
            CacheTier::Tier2,
            CacheTier::Tier3,
            CacheTier::Tier4,
        ] {
            assert_eq!(CacheTier::from_u8(tier.as_u8()), Some(tier));
        }
        assert_eq!(CacheTier::from_u8(0), None);
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let mut entry = CacheEntry::new(enhancement(), 60);
        entry.created_at_ms = 1_000_000;

        // Tier 4: 300s TTL
        assert!(!entry.is_expired_at(1_000_000 + 300 * 1000));
        assert!(entry.is_expired_at(1_000_000 + 300 * 1000 + 1));
    }
}
