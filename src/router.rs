//! Routing of completed serial lines to their outbound channels
//!
//! One completed line goes through: parse, position-cache observe, classify,
//! topic resolve. The payload handed to the transport is always the original
//! line text, never a re-serialized form, so upstream formatting and any extra
//! fields survive byte-for-byte.

use crate::protocol::{classify, MessageClass, PositionCache, TopicSet};
use serde_json::Value;
use tracing::{debug, trace};

/// Outcome of routing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome<'t, 'l> {
    /// Forward the original line text to the resolved topic, best effort.
    Publish { topic: &'t str, payload: &'l str },
    /// Malformed or unclassifiable line; dropped silently.
    Dropped,
}

/// Classification and dispatch resolution for uplink lines.
///
/// Owns the position cache so the observe side effect happens on every parsed
/// line, including lines that end up dropped and lines routed while the broker
/// link is down (the caller discards the `Publish` outcome in that case).
#[derive(Debug)]
pub struct Router {
    topics: TopicSet,
    position: PositionCache,
}

impl Router {
    pub fn new(topics: TopicSet) -> Self {
        Self {
            topics,
            position: PositionCache::default(),
        }
    }

    /// Route one completed line.
    ///
    /// Parse failures and unrecognized messages drop silently; malformed
    /// input must never stall the loop. The cache update happens before the
    /// classification verdict and is independent of it.
    pub fn route<'l>(&mut self, line: &'l str) -> RouteOutcome<'_, 'l> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                trace!("dropping unparseable line: {err}");
                return RouteOutcome::Dropped;
            }
        };

        self.position.observe(&value);

        let class = classify(&value);
        match self.topics.resolve(class) {
            Some(topic) => RouteOutcome::Publish {
                topic,
                payload: line,
            },
            None => {
                debug!(?class, "dropping line with no outbound channel");
                RouteOutcome::Dropped
            }
        }
    }

    pub fn position(&self) -> &PositionCache {
        &self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_router() -> Router {
        let topics = TopicSet::new(
            "fk/wh01/A/fl01/dev/cmd",
            "fk/wh01/A/fl01/jet/01/telemetry",
            "fk/wh01/A/fl01/dev/ack",
            "fk/wh01/A/fl01/dev/progress",
        )
        .unwrap();
        Router::new(topics)
    }

    fn expect_publish<'t, 'l>(outcome: RouteOutcome<'t, 'l>) -> (&'t str, &'l str) {
        match outcome {
            RouteOutcome::Publish { topic, payload } => (topic, payload),
            RouteOutcome::Dropped => panic!("expected publish, got drop"),
        }
    }

    #[test]
    fn test_explicit_telemetry_forwards_original_text() {
        let mut router = test_router();
        let line = r#"{"t":"telemetry","x":1,"y":2}"#;
        let (topic, payload) = expect_publish(router.route(line));
        assert_eq!(topic, "fk/wh01/A/fl01/jet/01/telemetry");
        assert_eq!(payload, line);
    }

    #[test]
    fn test_explicit_ack() {
        let mut router = test_router();
        let line = r#"{"t":"ack","id":7}"#;
        let (topic, payload) = expect_publish(router.route(line));
        assert_eq!(topic, "fk/wh01/A/fl01/dev/ack");
        assert_eq!(payload, line);
    }

    #[test]
    fn test_explicit_progress() {
        let mut router = test_router();
        let line = r#"{"t":"progress","pct":40}"#;
        let (topic, _) = expect_publish(router.route(line));
        assert_eq!(topic, "fk/wh01/A/fl01/dev/progress");
    }

    #[test]
    fn test_bogus_tag_dropped() {
        let mut router = test_router();
        assert_eq!(router.route(r#"{"t":"bogus"}"#), RouteOutcome::Dropped);
    }

    #[test]
    fn test_heuristic_full_pose() {
        let mut router = test_router();
        let line = r#"{"x":1.0,"y":2.0,"heading":90.0}"#;
        let (topic, payload) = expect_publish(router.route(line));
        assert_eq!(topic, "fk/wh01/A/fl01/jet/01/telemetry");
        assert_eq!(payload, line);
    }

    #[test]
    fn test_heuristic_missing_heading_still_telemetry() {
        let mut router = test_router();
        let line = r#"{"x":1.0,"y":2.0}"#;
        let (topic, _) = expect_publish(router.route(line));
        assert_eq!(topic, "fk/wh01/A/fl01/jet/01/telemetry");
    }

    #[test]
    fn test_heuristic_insufficient_fields_dropped() {
        let mut router = test_router();
        assert_eq!(router.route(r#"{"x":1.0}"#), RouteOutcome::Dropped);
    }

    #[test]
    fn test_malformed_json_dropped_without_panic() {
        let mut router = test_router();
        assert_eq!(router.route("not-json-at-all"), RouteOutcome::Dropped);
        assert_eq!(router.route(""), RouteOutcome::Dropped);
        assert_eq!(router.route("{\"unterminated\":"), RouteOutcome::Dropped);
    }

    #[test]
    fn test_dropped_line_still_updates_position_cache() {
        let mut router = test_router();
        // Heading alone is dropped by classification but cached anyway.
        assert_eq!(router.route(r#"{"heading":45.5}"#), RouteOutcome::Dropped);
        assert_eq!(router.position().heading, Some(45.5));
        assert_eq!(router.position().x, None);
        assert_eq!(router.position().y, None);
    }

    #[test]
    fn test_payload_preserved_byte_for_byte() {
        let mut router = test_router();
        // Odd spacing, extra fields and integer formatting all pass through.
        let line = r#"{ "t":"telemetry" , "x": 1, "y":2.50, "extra": [null, true] }"#;
        let (_, payload) = expect_publish(router.route(line));
        assert_eq!(payload, line);
    }
}
