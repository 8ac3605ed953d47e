//! Pure connection configuration for the MQTT session
//!
//! Builds `MqttOptions` from the `[mqtt]` config section: broker URL parsing,
//! keep-alive, credentials from the environment, and the TLS story the cloud
//! broker requires (server CA plus optional mutual-TLS client certificate).

use crate::config::MqttSection;
use rumqttc::v5::MqttOptions;
use rumqttc::{TlsConfiguration, Transport as RumqttcTransport};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// MQTT transport errors
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),
    #[error("Failed to read TLS material from {path}: {source}")]
    TlsMaterial {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Publishing failed")]
    PublishFailed(#[source] rumqttc::v5::ClientError),
    #[error("Subscription failed")]
    SubscriptionFailed(#[source] rumqttc::v5::ClientError),
    #[error("Not connected")]
    NotConnected,
}

/// Build MQTT options from the config section.
///
/// `mqtts://` URLs enable TLS; when a CA certificate is configured the
/// connection uses it (plus the client certificate pair when present, which is
/// what AWS IoT style brokers require), otherwise the platform trust roots.
pub fn configure_mqtt_options(
    device_id: &str,
    config: &MqttSection,
) -> Result<MqttOptions, MqttError> {
    let url = Url::parse(&config.broker_url)
        .map_err(|_| MqttError::InvalidBrokerUrl(config.broker_url.clone()))?;

    let host = url
        .host_str()
        .ok_or_else(|| MqttError::InvalidBrokerUrl(config.broker_url.clone()))?;
    let port = url
        .port()
        .unwrap_or(if url.scheme() == "mqtts" { 8883 } else { 1883 });

    let mut mqtt_options = MqttOptions::new(device_id, host, port);
    mqtt_options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

    if url.scheme() == "mqtts" {
        let transport = match &config.ca_cert {
            Some(ca_path) => {
                let ca = read_pem(ca_path)?;
                let client_auth = match (&config.client_cert, &config.private_key) {
                    (Some(cert_path), Some(key_path)) => {
                        Some((read_pem(cert_path)?, read_pem(key_path)?))
                    }
                    _ => None,
                };
                RumqttcTransport::Tls(TlsConfiguration::Simple {
                    ca,
                    alpn: None,
                    client_auth,
                })
            }
            None => RumqttcTransport::tls_with_default_config(),
        };
        mqtt_options.set_transport(transport);
    }

    if let Some(username_env) = &config.username_env {
        if let Ok(username) = std::env::var(username_env) {
            let password = config
                .password_env
                .as_ref()
                .and_then(|env_name| std::env::var(env_name).ok())
                .unwrap_or_default();
            mqtt_options.set_credentials(&username, &password);
        }
    }

    Ok(mqtt_options)
}

fn read_pem(path: &Path) -> Result<Vec<u8>, MqttError> {
    std::fs::read(path).map_err(|source| MqttError::TlsMaterial {
        path: path.display().to_string(),
        source,
    })
}
