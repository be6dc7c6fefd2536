//! Multi-tier result cache with confidence-dependent expiration.
//!
//! High-confidence results are trusted for a week; low-confidence results for
//! minutes. An optional persistent backing carries the working set across
//! restarts.

pub mod backing;
pub mod tiered;
pub mod types;

pub use backing::{CacheBacking, SqliteBacking};
pub use tiered::TieredCache;
pub use types::{CacheEntry, CacheProbe, CacheStats, CacheTier};
