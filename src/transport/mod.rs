//! Transport seams between the bridge loop and the outside world
//!
//! Three collaborators are abstracted behind traits so the loop, the guard and
//! the tests never touch a real port or broker directly: the serial byte
//! stream, the network layer beneath the broker session, and the broker
//! session itself.

use bytes::Bytes;

pub mod mqtt;
pub mod net;
pub mod serial;

/// One inbound downlink message drained from the broker session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundCommand {
    pub topic: String,
    pub payload: Bytes,
}

/// Bidirectional serial byte stream to the compute module.
///
/// Ordered, reliable, in-order delivery is assumed; the bridge only needs a
/// non-blocking drain of pending bytes and a framed line write.
#[async_trait::async_trait]
pub trait SerialLink: Send {
    /// Read whatever bytes are pending right now; `Ok(0)` when none are.
    fn read_available(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Write one payload framed with a trailing newline. Bounded: this is
    /// called from inside the loop's downlink hand-off and must not park.
    async fn write_line(&mut self, payload: &[u8]) -> std::io::Result<()>;
}

/// Network layer beneath the broker session.
///
/// On embedded deployments this is wireless association; on a host it is a
/// reachability check. Either way the guard only needs the two liveness
/// operations.
#[async_trait::async_trait]
pub trait NetworkLink: Send {
    /// Current association state; may consult a cached recent probe.
    async fn is_associated(&mut self) -> bool;

    /// One association attempt; `true` on success.
    async fn associate(&mut self) -> bool;
}

/// Broker session: connect, subscribe, fire-and-forget publish, and an event
/// pump that drains the inbound command backlog available at that instant.
#[async_trait::async_trait]
pub trait BrokerSession: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    fn is_connected(&self) -> bool;

    /// Establish the session; success means the broker acknowledged it.
    async fn connect(&mut self) -> Result<(), Self::Error>;

    /// Tear the session down explicitly.
    async fn disconnect(&mut self);

    /// Subscribe to a topic. The QoS requested is advisory; the transport may
    /// silently downgrade it.
    async fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Best-effort publish: QoS 0, retain false, no delivery confirmation.
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;

    /// Drain the inbound commands received since the last call. Must not
    /// block waiting for traffic.
    async fn service(&mut self) -> Vec<InboundCommand>;
}

/// Type alias for the production broker session.
pub type MqttTransport = mqtt::MqttSession;
