//! Connectivity guard: network and session liveness ahead of routing
//!
//! Two independent layers must be up before any line is dispatched: the
//! network association beneath the broker, and the broker session itself.
//! The guard re-establishes whichever layer is missing with bounded retries
//! and a fixed delay between attempts. Exhausting a retry budget is not
//! fatal; the next cycle starts over. Losing the network tears down an
//! active session first.

use crate::transport::{BrokerSession, NetworkLink};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Liveness state of the uplink path. Routing dispatch requires `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Network association is down.
    Disconnected,
    /// Network is up but the broker session is not established.
    NetworkOnly,
    /// Both layers are up and the command topic is subscribed.
    Ready,
}

/// Bounded-retry schedule for one connectivity layer.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay_ms: u64) -> Self {
        Self {
            attempts,
            delay: Duration::from_millis(delay_ms),
        }
    }
}

pub struct ConnectivityGuard<N, S> {
    network: N,
    session: S,
    network_retry: RetryPolicy,
    session_retry: RetryPolicy,
    command_topic: String,
    state: LinkState,
}

impl<N: NetworkLink, S: BrokerSession> ConnectivityGuard<N, S> {
    pub fn new(
        network: N,
        session: S,
        network_retry: RetryPolicy,
        session_retry: RetryPolicy,
        command_topic: &str,
    ) -> Self {
        Self {
            network,
            session,
            network_retry,
            session_retry,
            command_topic: command_topic.to_string(),
            state: LinkState::Disconnected,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Restore whatever layers are down; returns the state the cycle runs in.
    ///
    /// May block for the configured retry windows. This stalls the whole
    /// loop, which is accepted: there is no routing to do without a link,
    /// and serial framing catches up when the cycle resumes.
    pub async fn ensure_ready(&mut self) -> LinkState {
        if !self.network.is_associated().await {
            // An orphaned session cannot survive the network going away.
            if self.session.is_connected() {
                self.session.disconnect().await;
            }
            self.state = LinkState::Disconnected;
            if !self.try_associate().await {
                return self.state;
            }
            info!("network associated");
        }

        if self.session.is_connected() {
            self.state = LinkState::Ready;
            return self.state;
        }

        self.state = LinkState::NetworkOnly;
        if self.try_establish_session().await {
            self.state = LinkState::Ready;
        }
        self.state
    }

    async fn try_associate(&mut self) -> bool {
        for attempt in 1..=self.network_retry.attempts {
            if self.network.associate().await {
                return true;
            }
            if attempt < self.network_retry.attempts {
                sleep(self.network_retry.delay).await;
            }
        }
        warn!(
            attempts = self.network_retry.attempts,
            "network association retries exhausted; will retry next cycle"
        );
        false
    }

    async fn try_establish_session(&mut self) -> bool {
        for attempt in 1..=self.session_retry.attempts {
            match self.session.connect().await {
                Ok(()) => {
                    // Re-subscribe on every (re-)establishment; a fresh
                    // session has no server-side state we can rely on.
                    match self.session.subscribe(&self.command_topic).await {
                        Ok(()) => {
                            info!(topic = %self.command_topic, "command topic subscribed");
                            return true;
                        }
                        Err(e) => {
                            warn!("command subscribe failed: {e}");
                            self.session.disconnect().await;
                        }
                    }
                }
                Err(e) => {
                    warn!(attempt, "session connect failed: {e}");
                }
            }
            if attempt < self.session_retry.attempts {
                sleep(self.session_retry.delay).await;
            }
        }
        warn!(
            attempts = self.session_retry.attempts,
            "session retries exhausted; will retry next cycle"
        );
        false
    }
}
