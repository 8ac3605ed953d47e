//! Top-level error type for bridge operations
//!
//! Connectivity faults are handled inside the guard by retrying, and bad
//! input is dropped at the router; what reaches this type is the small set of
//! startup failures that genuinely prevent the bridge from running at all.

use crate::config::ConfigError;
use crate::transport::mqtt::MqttError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("MQTT transport error: {0}")]
    Mqtt(#[from] MqttError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ValidationError;

    #[test]
    fn test_config_error_converts() {
        let err: BridgeError = ConfigError::Invalid(ValidationError::EmptyTopic).into();
        assert!(matches!(err, BridgeError::Config(_)));
        assert!(err.to_string().contains("Topic cannot be empty"));
    }

    #[test]
    fn test_mqtt_error_converts() {
        let err: BridgeError = MqttError::NotConnected.into();
        assert!(matches!(err, BridgeError::Mqtt(_)));
    }
}
