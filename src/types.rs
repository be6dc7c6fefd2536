//! Shared data types for the enhancement engine.
//!
//! Defines the raw point input model, the three-state tag payload used by the
//! confidence scorer, and the enhancement result shape produced by both
//! collaborator paths.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A raw building-automation point awaiting enhancement.
///
/// Only `name` is guaranteed; every other field is optional metadata from the
/// telemetry network. The structured payloads (`kv_tags`, `bacnet_data`) are
/// carried as raw JSON text because upstream devices routinely emit malformed
/// blobs — parsing happens at scoring time, never at ingest.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Point {
    /// Opaque point name/path, also used as the cache key
    pub name: String,

    /// Free-text marker tags (e.g. Haystack-style space-separated markers)
    pub marker_tags: Option<String>,

    /// Structured key-value tag blob, raw JSON object text
    pub kv_tags: Option<String>,

    /// Structured device/protocol data (BACnet), raw JSON object text
    pub bacnet_data: Option<String>,

    /// Whether the point is enabled for data collection
    pub collect_enabled: bool,
}

impl Point {
    /// Convenience constructor for a bare point with no optional metadata.
    pub fn named(name: impl Into<String>) -> Self {
        Point {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Parse state of a loosely structured tag payload.
///
/// Upstream payloads arrive in three observable states: missing entirely,
/// present but unparseable, or present as a JSON object. The scorer collapses
/// `Malformed` into `Absent` so that bad payloads never surface as errors.
#[derive(Clone, Debug, PartialEq)]
pub enum TagPayload {
    /// Field missing or empty
    Absent,
    /// Field present but not a JSON object
    Malformed,
    /// Field present and parsed to a JSON object
    Object(Map<String, Value>),
}

impl TagPayload {
    /// Parse a raw optional payload into its three-state form.
    ///
    /// Anything that is not a JSON object (arrays, bare scalars, truncated
    /// text) is `Malformed`. Whitespace-only input is `Absent`.
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = match raw {
            Some(r) if !r.trim().is_empty() => r,
            _ => return TagPayload::Absent,
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => TagPayload::Object(map),
            _ => TagPayload::Malformed,
        }
    }

    /// The parsed object, if well-formed.
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            TagPayload::Object(map) => Some(map),
            _ => None,
        }
    }
}

/// Result of enhancing a single point, as returned by either collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enhancement {
    /// Human-readable display name
    pub display_name: String,

    /// Equipment classification (e.g. "AHU", "VAV", "Chiller")
    pub equipment_type: String,

    /// Confidence the collaborator reports for its own output, [0,100]
    pub confidence: u8,
}

/// An enhanced point in a batch result, tagged with the path that produced it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnhancedPoint {
    /// The source point's name
    pub name: String,

    /// The enhancement produced for it
    pub enhancement: Enhancement,

    /// Which routing tier served this point
    pub tier: crate::selector::EnhancementTier,
}
