//! Confidence scoring for raw point metadata.
//!
//! Estimates how completely a point's optional metadata supports a reliable
//! automated enhancement. The score is a pure function of which fields are
//! present and well-formed; it never fails and never touches shared state.

use crate::types::{Point, TagPayload};
use serde_json::Map;
use serde_json::Value;

/// Starting score for a point with no optional metadata.
pub const BASE_SCORE: i32 = 50;

/// Bonus for non-empty free-text marker tags.
pub const MARKER_TAGS_BONUS: i32 = 15;

/// Bonus for a well-formed, non-empty key-value tag blob.
pub const KV_TAGS_BONUS: i32 = 20;

/// Bonus for well-formed, non-empty device/protocol data.
pub const DEVICE_DATA_BONUS: i32 = 10;

/// Additional bonus when device data names both the device and the object.
pub const DEVICE_IDENTITY_BONUS: i32 = 5;

/// Bonus for a point enabled for collection.
pub const COLLECT_ENABLED_BONUS: i32 = 5;

/// Score a point's metadata completeness into [0,100].
///
/// Malformed structured payloads score as if absent. The sum is clamped, so
/// a fully populated point caps at 100 even though the raw increments exceed
/// it.
pub fn score(point: &Point) -> u8 {
    let mut total = BASE_SCORE;

    if point
        .marker_tags
        .as_deref()
        .map(|t| !t.trim().is_empty())
        .unwrap_or(false)
    {
        total += MARKER_TAGS_BONUS;
    }

    let kv_tags = TagPayload::parse(point.kv_tags.as_deref());
    if let Some(map) = kv_tags.as_object() {
        if !map.is_empty() {
            total += KV_TAGS_BONUS;
        }
    }

    let device_data = TagPayload::parse(point.bacnet_data.as_deref());
    if let Some(map) = device_data.as_object() {
        if !map.is_empty() {
            total += DEVICE_DATA_BONUS;

            if has_named_field(map, &["device_name", "deviceName"])
                && has_named_field(map, &["object_name", "objectName"])
            {
                total += DEVICE_IDENTITY_BONUS;
            }
        }
    }

    if point.collect_enabled {
        total += COLLECT_ENABLED_BONUS;
    }

    total.clamp(0, 100) as u8
}

/// True when the map carries a non-empty string under any of the given keys.
///
/// Device payloads arrive with inconsistent casing depending on the gateway
/// firmware, so both snake_case and camelCase spellings are accepted.
fn has_named_field(map: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().any(|key| {
        map.get(*key)
            .and_then(Value::as_str)
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_point_scores_base() {
        let point = Point::named("vav-301");
        assert_eq!(score(&point), 50);
    }

    #[test]
    fn test_each_increment_applies() {
        let mut point = Point::named("ahu-1");

        point.marker_tags = Some("hvac discharge temp sensor".to_string());
        assert_eq!(score(&point), 65);

        point.kv_tags = Some(r#"{"equip": "ahu", "floor": "2"}"#.to_string());
        assert_eq!(score(&point), 85);

        point.bacnet_data = Some(r#"{"instance": 3001}"#.to_string());
        assert_eq!(score(&point), 95);

        point.collect_enabled = true;
        assert_eq!(score(&point), 100);
    }

    #[test]
    fn test_device_identity_bonus_requires_both_names() {
        let mut point = Point::named("ahu-1");
        point.bacnet_data =
            Some(r#"{"device_name": "AHU-1 Controller", "instance": 3001}"#.to_string());
        assert_eq!(score(&point), 60, "device name alone earns no identity bonus");

        point.bacnet_data = Some(
            r#"{"device_name": "AHU-1 Controller", "object_name": "SA-T"}"#.to_string(),
        );
        assert_eq!(score(&point), 65);
    }

    #[test]
    fn test_camel_case_device_fields_accepted() {
        let mut point = Point::named("ahu-1");
        point.bacnet_data =
            Some(r#"{"deviceName": "AHU-1", "objectName": "SA-T"}"#.to_string());
        assert_eq!(score(&point), 65);
    }

    #[test]
    fn test_malformed_payloads_score_as_absent() {
        let mut point = Point::named("vav-301");
        point.kv_tags = Some("{truncated".to_string());
        point.bacnet_data = Some("[1,2,3]".to_string());
        assert_eq!(score(&point), 50);
    }

    #[test]
    fn test_empty_objects_earn_no_bonus() {
        let mut point = Point::named("vav-301");
        point.kv_tags = Some("{}".to_string());
        point.bacnet_data = Some("{}".to_string());
        assert_eq!(score(&point), 50);
    }

    #[test]
    fn test_fully_populated_point_clamps_at_100() {
        let point = Point {
            name: "chw-pump-2".to_string(),
            marker_tags: Some("chilled water pump".to_string()),
            kv_tags: Some(r#"{"equip": "pump"}"#.to_string()),
            bacnet_data: Some(
                r#"{"device_name": "CHW-P2", "object_name": "Status"}"#.to_string(),
            ),
            collect_enabled: true,
        };
        // Raw sum is 105; the clamp holds the contract's upper bound.
        assert_eq!(score(&point), 100);
    }

    #[test]
    fn test_score_always_in_bounds() {
        let points = [
            Point::named("a"),
            Point {
                name: "b".to_string(),
                marker_tags: Some("x".to_string()),
                kv_tags: Some("not json at all".to_string()),
                bacnet_data: Some(r#"{"deviceName": "D", "objectName": "O"}"#.to_string()),
                collect_enabled: true,
            },
        ];

        for point in &points {
            let s = score(point);
            assert!(s <= 100, "score {} out of range for {}", s, point.name);
        }
    }
}
