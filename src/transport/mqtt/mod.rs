//! MQTT broker session over rumqttc
//!
//! `connection` holds the pure option/TLS configuration and the error
//! taxonomy; `session` is the impure client, with a background task driving
//! the event loop for the session's lifetime.
//!
//! # Usage
//!
//! ```rust,no_run
//! use jetbridge::config::MqttSection;
//! use jetbridge::transport::{mqtt::MqttSession, BrokerSession};
//!
//! # tokio_test::block_on(async {
//! let config = MqttSection {
//!     broker_url: "mqtt://localhost:1883".to_string(),
//!     keep_alive_secs: 30,
//!     username_env: None,
//!     password_env: None,
//!     ca_cert: None,
//!     client_cert: None,
//!     private_key: None,
//! };
//!
//! let mut session = MqttSession::new("fl01-bridge", config, "fk/wh01/A/fl01/dev/cmd");
//! session.connect().await?;
//! session.subscribe("fk/wh01/A/fl01/dev/cmd").await?;
//! # Ok::<(), jetbridge::transport::mqtt::MqttError>(())
//! # });
//! ```

pub mod connection;
pub mod session;

pub use connection::{configure_mqtt_options, MqttError};
pub use session::MqttSession;
