//! The bridge loop: one cooperative cycle tying all the pieces together
//!
//! Each cycle, in order: restore connectivity, pump the broker session and
//! hand inbound commands to the serial peer, then drain pending serial bytes
//! through the line assembler and route every completed line. Everything runs
//! on one task; the only suspension points are the guard's bounded retry
//! delays and the short idle sleep between cycles.

use crate::config::HeartbeatSection;
use crate::framing::LineAssembler;
use crate::guard::{ConnectivityGuard, LinkState};
use crate::protocol::{PositionCache, TopicSet};
use crate::router::{RouteOutcome, Router};
use crate::transport::{BrokerSession, NetworkLink, SerialLink};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Idle delay between cycles when the serial stream runs dry.
const IDLE_DELAY: Duration = Duration::from_millis(5);

/// Backup telemetry synthesized from the position cache.
///
/// Publishes only when enabled, the link is Ready and all three pose fields
/// have been seen; the peer's own telemetry remains the primary source.
#[derive(Debug)]
struct Heartbeat {
    enabled: bool,
    interval: Duration,
    last: Option<Instant>,
}

impl Heartbeat {
    fn new(config: &HeartbeatSection) -> Self {
        Self {
            enabled: config.enabled,
            interval: Duration::from_secs(config.interval_secs),
            last: None,
        }
    }

    fn due(&mut self, cache: &PositionCache) -> bool {
        if !self.enabled || !cache.is_complete() {
            return false;
        }
        match self.last {
            Some(at) if at.elapsed() < self.interval => false,
            _ => {
                self.last = Some(Instant::now());
                true
            }
        }
    }

    fn payload(cache: &PositionCache, ts_millis: i64) -> Option<String> {
        Some(format!(
            r#"{{"t":"telemetry","x":{:.3},"y":{:.3},"heading":{:.2},"ts":{}}}"#,
            cache.x?, cache.y?, cache.heading?, ts_millis
        ))
    }
}

/// Owns every piece of mutable bridge state; no globals, no locks.
pub struct Bridge<L, N, S> {
    serial: L,
    guard: ConnectivityGuard<N, S>,
    assembler: LineAssembler,
    router: Router,
    telemetry_topic: String,
    heartbeat: Heartbeat,
}

impl<L, N, S> Bridge<L, N, S>
where
    L: SerialLink,
    N: NetworkLink,
    S: BrokerSession,
{
    pub fn new(
        serial: L,
        guard: ConnectivityGuard<N, S>,
        topics: TopicSet,
        max_line_len: usize,
        heartbeat: &HeartbeatSection,
    ) -> Self {
        let telemetry_topic = topics.telemetry.clone();
        Self {
            serial,
            guard,
            assembler: LineAssembler::new(max_line_len),
            router: Router::new(topics),
            telemetry_topic,
            heartbeat: Heartbeat::new(heartbeat),
        }
    }

    /// Last-known pose observed on the uplink.
    pub fn position(&self) -> &PositionCache {
        self.router.position()
    }

    /// Run cycles until the task is cancelled (shutdown happens by dropping
    /// the future, from the signal handler in `main`).
    pub async fn run(&mut self) {
        loop {
            self.cycle().await;
            tokio::time::sleep(IDLE_DELAY).await;
        }
    }

    /// One loop iteration; public for tests driving the bridge step by step.
    pub async fn cycle(&mut self) -> LinkState {
        let state = self.guard.ensure_ready().await;
        let ready = state == LinkState::Ready;

        if ready {
            self.pump_downlink().await;
        }

        // Serial bytes are drained even while disconnected so framing stays
        // in sync; completed lines go unrouted but still feed the cache.
        self.drain_serial(ready).await;

        if ready {
            self.maybe_heartbeat().await;
        }

        self.guard.state()
    }

    /// Forward each drained inbound command verbatim, framed as one line.
    async fn pump_downlink(&mut self) {
        for command in self.guard.session_mut().service().await {
            debug!(topic = %command.topic, "forwarding downlink command");
            if let Err(e) = self.serial.write_line(&command.payload).await {
                warn!("downlink write failed: {e}");
            }
        }
    }

    async fn drain_serial(&mut self, ready: bool) {
        let mut buf = [0u8; 256];
        loop {
            let n = match self.serial.read_available(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("serial read failed: {e}");
                    break;
                }
            };
            for &byte in &buf[..n] {
                if let Some(line) = self.assembler.feed(byte) {
                    self.route_line(&line, ready).await;
                }
            }
        }
    }

    async fn route_line(&mut self, line: &str, ready: bool) {
        // route() always runs so the position cache sees every parsed line;
        // its Publish verdict is discarded while the link is not Ready.
        match self.router.route(line) {
            RouteOutcome::Publish { topic, payload } => {
                if !ready {
                    return;
                }
                if let Err(e) = self.guard.session_mut().publish(topic, payload.as_bytes()).await
                {
                    warn!("publish to {topic} failed: {e}");
                }
            }
            RouteOutcome::Dropped => {}
        }
    }

    async fn maybe_heartbeat(&mut self) {
        if !self.heartbeat.due(self.router.position()) {
            return;
        }
        let ts = chrono::Utc::now().timestamp_millis();
        let Some(payload) = Heartbeat::payload(self.router.position(), ts) else {
            return;
        };
        if let Err(e) = self
            .guard
            .session_mut()
            .publish(&self.telemetry_topic, payload.as_bytes())
            .await
        {
            warn!("heartbeat publish failed: {e}");
        }
    }
}
