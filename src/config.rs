//! Bridge configuration loaded from TOML
//!
//! One file describes a bridge instance end to end: the serial port it drains,
//! the broker it uplinks to, the four fixed topics, the retry budgets of the
//! connectivity guard, and the optional heartbeat publisher. Secrets never
//! live in the file; credential fields name environment variables instead.

use crate::framing::DEFAULT_MAX_LINE_LEN;
use crate::protocol::{validate_device_id, TopicSet, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    pub bridge: BridgeSection,
    pub serial: SerialSection,
    pub mqtt: MqttSection,
    pub topics: TopicsSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub heartbeat: HeartbeatSection,
}

/// Identity of this bridge instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeSection {
    /// Broker client identifier (must match [a-zA-Z0-9._-]+)
    pub device_id: String,
}

/// Serial link to the compute module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialSection {
    /// Port path, e.g. /dev/ttyUSB0
    pub port: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Longest accepted line in bytes; anything longer is discarded whole.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
}

fn default_baud() -> u32 {
    115_200
}

fn default_max_line_len() -> usize {
    DEFAULT_MAX_LINE_LEN
}

/// Broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// Broker URL; mqtts:// enables TLS (default port 8883)
    pub broker_url: String,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// Environment variable holding the username
    pub username_env: Option<String>,
    /// Environment variable holding the password
    pub password_env: Option<String>,
    /// Server CA certificate (PEM); enables explicit trust instead of the
    /// platform roots
    pub ca_cert: Option<PathBuf>,
    /// Client certificate (PEM) for mutual TLS
    pub client_cert: Option<PathBuf>,
    /// Client private key (PEM) for mutual TLS
    pub private_key: Option<PathBuf>,
}

fn default_keep_alive() -> u64 {
    30
}

/// The four fixed channels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicsSection {
    /// Inbound: broker commands forwarded to the serial peer
    pub command: String,
    pub telemetry: String,
    pub ack: String,
    pub progress: String,
}

/// Retry budgets for the connectivity guard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrySection {
    pub network_attempts: u32,
    pub network_delay_ms: u64,
    pub session_attempts: u32,
    pub session_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            network_attempts: 60,
            network_delay_ms: 500,
            session_attempts: 10,
            session_delay_ms: 1200,
        }
    }
}

/// Backup telemetry from the position cache, off unless asked for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeartbeatSection {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for HeartbeatSection {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 3,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

impl BridgeConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: BridgeConfig = toml::from_str(&content)?;

        validate_device_id(&config.bridge.device_id)?;
        config.topic_set()?;

        Ok(config)
    }

    /// Canonicalized, validated topic set for this instance.
    pub fn topic_set(&self) -> Result<TopicSet, ValidationError> {
        TopicSet::new(
            &self.topics.command,
            &self.topics.telemetry,
            &self.topics.ack,
            &self.topics.progress,
        )
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[bridge]
device_id = "forklift_wh01-A-fl01-bridge-01"

[serial]
port = "/dev/ttyUSB0"

[mqtt]
broker_url = "mqtt://localhost:1883"

[topics]
command = "fk/wh01/A/fl01/dev/cmd"
telemetry = "fk/wh01/A/fl01/jet/01/telemetry"
ack = "fk/wh01/A/fl01/dev/ack"
progress = "fk/wh01/A/fl01/dev/progress"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config = BridgeConfig::test_config();
        assert_eq!(config.serial.baud, 115_200);
        assert_eq!(config.serial.max_line_len, 900);
        assert_eq!(config.mqtt.keep_alive_secs, 30);
        assert_eq!(config.retry.network_attempts, 60);
        assert_eq!(config.retry.network_delay_ms, 500);
        assert_eq!(config.retry.session_attempts, 10);
        assert_eq!(config.retry.session_delay_ms, 1200);
        assert!(!config.heartbeat.enabled);
        assert_eq!(config.heartbeat.interval_secs, 3);
    }

    #[test]
    fn test_full_config_parses() {
        let toml_content = r#"
[bridge]
device_id = "fl01-bridge"

[serial]
port = "/dev/ttyACM0"
baud = 921600
max_line_len = 2048

[mqtt]
broker_url = "mqtts://broker.example.com:8883"
keep_alive_secs = 60
username_env = "MQTT_USERNAME"
password_env = "MQTT_PASSWORD"
ca_cert = "certs/root-ca.pem"
client_cert = "certs/device.pem"
private_key = "certs/device.key"

[topics]
command = "fk/wh01/A/fl01/dev/cmd"
telemetry = "fk/wh01/A/fl01/jet/01/telemetry"
ack = "fk/wh01/A/fl01/dev/ack"
progress = "fk/wh01/A/fl01/dev/progress"

[retry]
network_attempts = 5
network_delay_ms = 100
session_attempts = 3
session_delay_ms = 200

[heartbeat]
enabled = true
interval_secs = 10
"#;

        let config: BridgeConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.serial.baud, 921_600);
        assert_eq!(config.mqtt.username_env, Some("MQTT_USERNAME".to_string()));
        assert_eq!(config.mqtt.ca_cert, Some(PathBuf::from("certs/root-ca.pem")));
        assert_eq!(config.retry.session_attempts, 3);
        assert!(config.heartbeat.enabled);
    }

    #[test]
    fn test_topic_set_canonicalizes() {
        let mut config = BridgeConfig::test_config();
        config.topics.command = "fk//wh01/dev/cmd/".to_string();
        let topics = config.topic_set().unwrap();
        assert_eq!(topics.command, "fk/wh01/dev/cmd");
    }

    #[test]
    fn test_invalid_device_id_rejected() {
        let result = validate_device_id("bad device!");
        assert!(result.is_err());
    }
}
