//! Host-side network association layer
//!
//! The connectivity guard tracks network liveness separately from the broker
//! session. On a host OS that question is "can we still reach the broker
//! endpoint", answered with a bounded TCP probe. Probe results are cached for
//! a freshness window so the hot loop does not open a socket per cycle.

use crate::transport::NetworkLink;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const PROBE_FRESHNESS: Duration = Duration::from_secs(15);

pub struct HostNetwork {
    host: String,
    port: u16,
    last_success: Option<Instant>,
}

impl HostNetwork {
    /// Probe target taken from the broker URL (host and effective port).
    pub fn from_broker_url(broker_url: &str) -> Option<Self> {
        let url = Url::parse(broker_url).ok()?;
        let host = url.host_str()?.to_string();
        let port = url
            .port()
            .unwrap_or(if url.scheme() == "mqtts" { 8883 } else { 1883 });
        Some(Self {
            host,
            port,
            last_success: None,
        })
    }

    async fn probe(&mut self) -> bool {
        let addr = format!("{}:{}", self.host, self.port);
        match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await {
            Ok(Ok(_)) => {
                self.last_success = Some(Instant::now());
                true
            }
            Ok(Err(e)) => {
                debug!("network probe to {addr} failed: {e}");
                self.last_success = None;
                false
            }
            Err(_) => {
                debug!("network probe to {addr} timed out");
                self.last_success = None;
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl NetworkLink for HostNetwork {
    async fn is_associated(&mut self) -> bool {
        match self.last_success {
            Some(at) if at.elapsed() < PROBE_FRESHNESS => true,
            _ => self.probe().await,
        }
    }

    async fn associate(&mut self) -> bool {
        self.probe().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_target_from_broker_url() {
        let net = HostNetwork::from_broker_url("mqtts://broker.example.com").unwrap();
        assert_eq!(net.host, "broker.example.com");
        assert_eq!(net.port, 8883);

        let net = HostNetwork::from_broker_url("mqtt://localhost:1883").unwrap();
        assert_eq!(net.host, "localhost");
        assert_eq!(net.port, 1883);

        assert!(HostNetwork::from_broker_url("not a url").is_none());
    }

    #[tokio::test]
    async fn test_associate_succeeds_against_listening_socket() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut net = HostNetwork::from_broker_url(&format!("mqtt://127.0.0.1:{port}")).unwrap();
        assert!(net.associate().await);
        // A fresh success short-circuits the next liveness check.
        assert!(net.is_associated().await);
    }

    #[tokio::test]
    async fn test_associate_fails_against_closed_port() {
        // Bind then drop to get a port that is very likely closed.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut net = HostNetwork::from_broker_url(&format!("mqtt://127.0.0.1:{port}")).unwrap();
        assert!(!net.associate().await);
    }
}
