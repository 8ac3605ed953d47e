//! Topic canonicalization and validation for the bridge's fixed channels
//!
//! The bridge speaks on exactly four topics: one inbound command topic it
//! subscribes to, and three outbound topics (telemetry, ack, progress) it
//! publishes to. All four are configuration constants, canonicalized and
//! validated at load time so the routing path never has to re-check them.

use crate::protocol::messages::MessageClass;
use thiserror::Error;

/// Collapse duplicate slashes and strip a trailing slash.
///
/// Broker deployments here use relative topic trees (`fk/wh01/A/...`), so no
/// leading slash is forced onto the result.
pub fn canonicalize_topic(topic: &str) -> String {
    let mut result = topic.to_string();

    while result.contains("//") {
        result = result.replace("//", "/");
    }

    if result.len() > 1 && result.ends_with('/') {
        result.pop();
    }

    result
}

/// Validate a device/client identifier against `[a-zA-Z0-9._-]+`.
pub fn validate_device_id(device_id: &str) -> Result<(), ValidationError> {
    if device_id.is_empty() {
        return Err(ValidationError::EmptyDeviceId);
    }

    for ch in device_id.chars() {
        if !ch.is_ascii_alphanumeric() && ch != '.' && ch != '_' && ch != '-' {
            return Err(ValidationError::InvalidDeviceIdChar(ch));
        }
    }

    Ok(())
}

fn validate_topic(topic: &str) -> Result<(), ValidationError> {
    if topic.is_empty() {
        return Err(ValidationError::EmptyTopic);
    }
    if topic.contains('+') || topic.contains('#') {
        return Err(ValidationError::WildcardInTopic(topic.to_string()));
    }
    Ok(())
}

/// Topic validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Device ID cannot be empty")]
    EmptyDeviceId,
    #[error("Device ID contains invalid character: '{0}'")]
    InvalidDeviceIdChar(char),
    #[error("Topic cannot be empty")]
    EmptyTopic,
    #[error("Topic must not contain wildcards: '{0}'")]
    WildcardInTopic(String),
}

/// The four fixed channels of one bridge instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicSet {
    /// Inbound: broker commands forwarded verbatim to the serial peer.
    pub command: String,
    /// Outbound status channels.
    pub telemetry: String,
    pub ack: String,
    pub progress: String,
}

impl TopicSet {
    /// Build a validated topic set from the configured strings.
    pub fn new(
        command: &str,
        telemetry: &str,
        ack: &str,
        progress: &str,
    ) -> Result<Self, ValidationError> {
        let set = Self {
            command: canonicalize_topic(command),
            telemetry: canonicalize_topic(telemetry),
            ack: canonicalize_topic(ack),
            progress: canonicalize_topic(progress),
        };
        validate_topic(&set.command)?;
        validate_topic(&set.telemetry)?;
        validate_topic(&set.ack)?;
        validate_topic(&set.progress)?;
        Ok(set)
    }

    /// Resolve a message class to its outbound topic; unrecognized has none.
    pub fn resolve(&self, class: MessageClass) -> Option<&str> {
        match class {
            MessageClass::Telemetry => Some(&self.telemetry),
            MessageClass::Ack => Some(&self.ack),
            MessageClass::Progress => Some(&self.progress),
            MessageClass::Unrecognized => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_canonicalize_collapses_slashes() {
        assert_eq!(canonicalize_topic("fk//wh01///dev/cmd"), "fk/wh01/dev/cmd");
        assert_eq!(canonicalize_topic("fk/wh01/dev/cmd/"), "fk/wh01/dev/cmd");
        assert_eq!(canonicalize_topic("fk/wh01/dev/cmd"), "fk/wh01/dev/cmd");
    }

    #[test]
    fn test_validate_device_id() {
        assert!(validate_device_id("forklift_wh01-A-fl01.esp-01").is_ok());
        assert_eq!(validate_device_id(""), Err(ValidationError::EmptyDeviceId));
        assert_eq!(
            validate_device_id("bad id"),
            Err(ValidationError::InvalidDeviceIdChar(' '))
        );
    }

    #[test]
    fn test_topic_set_rejects_wildcards() {
        let result = TopicSet::new("dev/cmd/#", "jet/telemetry", "dev/ack", "dev/progress");
        assert!(matches!(result, Err(ValidationError::WildcardInTopic(_))));

        let result = TopicSet::new("dev/cmd", "jet/+/telemetry", "dev/ack", "dev/progress");
        assert!(matches!(result, Err(ValidationError::WildcardInTopic(_))));
    }

    #[test]
    fn test_topic_set_rejects_empty() {
        let result = TopicSet::new("", "jet/telemetry", "dev/ack", "dev/progress");
        assert_eq!(result, Err(ValidationError::EmptyTopic));
    }

    #[test]
    fn test_resolve() {
        let set = TopicSet::new(
            "fk/wh01/A/fl01/dev/cmd",
            "fk/wh01/A/fl01/jet/01/telemetry",
            "fk/wh01/A/fl01/dev/ack",
            "fk/wh01/A/fl01/dev/progress",
        )
        .unwrap();

        assert_eq!(
            set.resolve(MessageClass::Telemetry),
            Some("fk/wh01/A/fl01/jet/01/telemetry")
        );
        assert_eq!(set.resolve(MessageClass::Ack), Some("fk/wh01/A/fl01/dev/ack"));
        assert_eq!(
            set.resolve(MessageClass::Progress),
            Some("fk/wh01/A/fl01/dev/progress")
        );
        assert_eq!(set.resolve(MessageClass::Unrecognized), None);
    }

    proptest! {
        #[test]
        fn prop_canonicalize_is_idempotent(topic in "[a-z0-9/]{0,40}") {
            let once = canonicalize_topic(&topic);
            let twice = canonicalize_topic(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_canonical_topics_have_no_double_slash(topic in "[a-z0-9/]{1,40}") {
            let canonical = canonicalize_topic(&topic);
            prop_assert!(!canonical.contains("//"));
        }
    }
}
