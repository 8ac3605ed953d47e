//! Message classification and the last-known position cache
//!
//! Lines from the serial peer carry an optional explicit type tag `t` and up to
//! three numeric pose fields (`x`, `y`, `heading`). Classification is a pure
//! function over the parsed JSON value; the position cache is the one side
//! effect the bridge keeps regardless of routing outcome.

use serde_json::Value;

/// Routing class of one parsed line.
///
/// Closed set: an explicit tag always wins, even when its value is unknown.
/// `Unrecognized` lines are dropped by the router, which is routing policy,
/// not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    Telemetry,
    Ack,
    Progress,
    Unrecognized,
}

/// Classify a parsed line for routing.
///
/// Priority order:
/// 1. A string `t` field is an explicit tag: `"telemetry"`, `"ack"` and
///    `"progress"` map directly; any other string drops the line with no
///    heuristic fallback. A non-string `t` does not count as a tag.
/// 2. Without a tag, field presence decides: `x`+`y`+`heading` is telemetry,
///    and `x`+`y` alone is still telemetry (older peers omit heading).
///    Anything else is unrecognized.
pub fn classify(value: &Value) -> MessageClass {
    if let Some(tag) = value.get("t").and_then(Value::as_str) {
        return match tag {
            "telemetry" => MessageClass::Telemetry,
            "ack" => MessageClass::Ack,
            "progress" => MessageClass::Progress,
            _ => MessageClass::Unrecognized,
        };
    }

    let has_x = value.get("x").is_some();
    let has_y = value.get("y").is_some();

    if has_x && has_y {
        MessageClass::Telemetry
    } else {
        MessageClass::Unrecognized
    }
}

/// Last-known pose of the serial peer.
///
/// Overwritten opportunistically by whichever of the three fields a parsed
/// line carries, even when the line is ultimately dropped, and even while the
/// broker link is down. Read only by the heartbeat publisher.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionCache {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub heading: Option<f64>,
}

impl PositionCache {
    /// Absorb whichever pose fields are present and numeric.
    pub fn observe(&mut self, value: &Value) {
        if let Some(x) = value.get("x").and_then(Value::as_f64) {
            self.x = Some(x);
        }
        if let Some(y) = value.get("y").and_then(Value::as_f64) {
            self.y = Some(y);
        }
        if let Some(heading) = value.get("heading").and_then(Value::as_f64) {
            self.heading = Some(heading);
        }
    }

    /// True once all three fields have been seen at least once.
    pub fn is_complete(&self) -> bool {
        self.x.is_some() && self.y.is_some() && self.heading.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explicit_tags() {
        assert_eq!(
            classify(&json!({"t": "telemetry", "x": 1, "y": 2})),
            MessageClass::Telemetry
        );
        assert_eq!(classify(&json!({"t": "ack", "id": 7})), MessageClass::Ack);
        assert_eq!(
            classify(&json!({"t": "progress", "pct": 50})),
            MessageClass::Progress
        );
    }

    #[test]
    fn test_unknown_tag_drops_without_fallback() {
        // All heuristic fields present, but the bogus tag still wins.
        assert_eq!(
            classify(&json!({"t": "bogus", "x": 1.0, "y": 2.0, "heading": 3.0})),
            MessageClass::Unrecognized
        );
        assert_eq!(classify(&json!({"t": "bogus"})), MessageClass::Unrecognized);
    }

    #[test]
    fn test_non_string_tag_falls_through_to_heuristic() {
        assert_eq!(
            classify(&json!({"t": 5, "x": 1.0, "y": 2.0})),
            MessageClass::Telemetry
        );
        assert_eq!(classify(&json!({"t": 5})), MessageClass::Unrecognized);
    }

    #[test]
    fn test_heuristic_classification() {
        assert_eq!(
            classify(&json!({"x": 1.0, "y": 2.0, "heading": 90.0})),
            MessageClass::Telemetry
        );
        // Older peers omit heading; coordinates alone are still telemetry.
        assert_eq!(
            classify(&json!({"x": 1.0, "y": 2.0})),
            MessageClass::Telemetry
        );
        assert_eq!(classify(&json!({"x": 1.0})), MessageClass::Unrecognized);
        assert_eq!(
            classify(&json!({"heading": 45.0})),
            MessageClass::Unrecognized
        );
        assert_eq!(classify(&json!({"ts": 123})), MessageClass::Unrecognized);
    }

    #[test]
    fn test_cache_partial_update() {
        let mut cache = PositionCache::default();
        cache.observe(&json!({"x": 1.5, "y": 2.5}));
        assert_eq!(cache.x, Some(1.5));
        assert_eq!(cache.y, Some(2.5));
        assert_eq!(cache.heading, None);
        assert!(!cache.is_complete());

        // A heading-only line updates heading and leaves x/y alone.
        cache.observe(&json!({"heading": 45.5}));
        assert_eq!(cache.x, Some(1.5));
        assert_eq!(cache.y, Some(2.5));
        assert_eq!(cache.heading, Some(45.5));
        assert!(cache.is_complete());
    }

    #[test]
    fn test_cache_ignores_non_numeric_fields() {
        let mut cache = PositionCache::default();
        cache.observe(&json!({"x": "not-a-number", "y": 2.0}));
        assert_eq!(cache.x, None);
        assert_eq!(cache.y, Some(2.0));
    }
}
