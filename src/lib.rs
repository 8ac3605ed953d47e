//! jetbridge - serial-to-MQTT uplink bridge
//!
//! Connects a serial-attached compute module that emits newline-delimited
//! JSON status lines to a TLS-secured MQTT broker, and relays downlink
//! commands from the broker back to the serial peer.
//!
//! # Overview
//!
//! - Bounded line framing for the serial byte stream ([`framing`])
//! - Classification and routing of each line to one of three outbound
//!   channels, forwarding the original text verbatim ([`protocol`], [`router`])
//! - A connectivity guard that keeps network association and the broker
//!   session alive with bounded retries before any routing runs ([`guard`])
//! - A single-task cooperative loop tying it together ([`bridge`])
//!
//! # Quick Start
//!
//! ```rust
//! use jetbridge::protocol::{classify, MessageClass, TopicSet};
//! use jetbridge::router::{RouteOutcome, Router};
//!
//! let topics = TopicSet::new(
//!     "fk/wh01/A/fl01/dev/cmd",
//!     "fk/wh01/A/fl01/jet/01/telemetry",
//!     "fk/wh01/A/fl01/dev/ack",
//!     "fk/wh01/A/fl01/dev/progress",
//! )
//! .unwrap();
//!
//! let mut router = Router::new(topics);
//! let line = r#"{"t":"telemetry","x":1.0,"y":2.0}"#;
//! match router.route(line) {
//!     RouteOutcome::Publish { topic, payload } => {
//!         assert!(topic.ends_with("telemetry"));
//!         assert_eq!(payload, line); // original text, never re-serialized
//!     }
//!     RouteOutcome::Dropped => unreachable!(),
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod framing;
pub mod guard;
pub mod logging;
pub mod protocol;
pub mod router;
pub mod testing;
pub mod transport;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use framing::LineAssembler;
pub use guard::{ConnectivityGuard, LinkState, RetryPolicy};
pub use protocol::{classify, MessageClass, PositionCache, TopicSet};
pub use router::{RouteOutcome, Router};
pub use transport::mqtt::MqttSession;
