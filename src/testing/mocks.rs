//! Mock implementations of the transport seams
//!
//! All three mocks share their state behind an `Arc` and are `Clone`, so a
//! test can hand one to the bridge and keep a handle for scripting input and
//! inspecting what was written or published.

use crate::transport::{BrokerSession, InboundCommand, NetworkLink, SerialLink};
use crate::transport::mqtt::MqttError;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct NetworkState {
    associated: bool,
    reachable: bool,
}

/// Mock network layer with a scriptable association state.
#[derive(Debug, Clone, Default)]
pub struct MockNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MockNetwork {
    /// A network that is already associated and stays reachable.
    pub fn associated() -> Self {
        Self {
            state: Arc::new(Mutex::new(NetworkState {
                associated: true,
                reachable: true,
            })),
        }
    }

    /// A network where association never succeeds.
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Drop (or restore) the association; an un-associated network also
    /// becomes unreachable until restored.
    pub fn set_associated(&self, associated: bool) {
        let mut state = self.state.lock().unwrap();
        state.associated = associated;
        state.reachable = associated;
    }
}

#[async_trait::async_trait]
impl NetworkLink for MockNetwork {
    async fn is_associated(&mut self) -> bool {
        self.state.lock().unwrap().associated
    }

    async fn associate(&mut self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.reachable {
            state.associated = true;
        }
        state.associated
    }
}

#[derive(Debug, Default)]
struct SessionState {
    connected: bool,
    refuse_connects: bool,
    failures_remaining: u32,
    subscriptions: Vec<String>,
    published: Vec<(String, Vec<u8>)>,
    inbound: VecDeque<InboundCommand>,
}

/// Mock broker session recording publishes and replaying scripted commands.
#[derive(Debug, Clone, Default)]
pub struct MockSession {
    state: Arc<Mutex<SessionState>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connect attempt fails.
    pub fn refusing_connects() -> Self {
        let session = Self::default();
        session.state.lock().unwrap().refuse_connects = true;
        session
    }

    /// The first `n` connect attempts fail, then connects succeed.
    pub fn failing_connects(n: u32) -> Self {
        let session = Self::default();
        session.state.lock().unwrap().failures_remaining = n;
        session
    }

    /// Queue an inbound command for the next `service` call.
    pub fn queue_command(&self, topic: &str, payload: &[u8]) {
        self.state.lock().unwrap().inbound.push_back(InboundCommand {
            topic: topic.to_string(),
            payload: Bytes::copy_from_slice(payload),
        });
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().unwrap().published.clone()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    /// Simulate the broker dropping the session.
    pub fn drop_session(&self) {
        self.state.lock().unwrap().connected = false;
    }
}

#[async_trait::async_trait]
impl BrokerSession for MockSession {
    type Error = MqttError;

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    async fn connect(&mut self) -> Result<(), MqttError> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_connects {
            return Err(MqttError::ConnectionFailed("mock refusal".to_string()));
        }
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(MqttError::ConnectionFailed(
                "mock transient failure".to_string(),
            ));
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.state.lock().unwrap().connected = false;
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(MqttError::NotConnected);
        }
        state.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(MqttError::NotConnected);
        }
        state.published.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    async fn service(&mut self) -> Vec<InboundCommand> {
        self.state.lock().unwrap().inbound.drain(..).collect()
    }
}

#[derive(Debug, Default)]
struct SerialState {
    inbound: VecDeque<u8>,
    written: Vec<Vec<u8>>,
}

/// Mock serial link: scripted inbound bytes, recorded downlink writes.
#[derive(Debug, Clone, Default)]
pub struct MockSerial {
    state: Arc<Mutex<SerialState>>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes to the pending inbound stream.
    pub fn feed(&self, bytes: &[u8]) {
        self.state.lock().unwrap().inbound.extend(bytes.iter().copied());
    }

    /// Lines written to the peer, without the trailing newline.
    pub fn written_lines(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().written.clone()
    }
}

#[async_trait::async_trait]
impl SerialLink for MockSerial {
    fn read_available(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        let mut n = 0;
        while n < buf.len() {
            match state.inbound.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    async fn write_line(&mut self, payload: &[u8]) -> std::io::Result<()> {
        self.state.lock().unwrap().written.push(payload.to_vec());
        Ok(())
    }
}
