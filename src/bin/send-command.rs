//! Downlink command injection utility
//!
//! Publishes a payload to a bridge's command topic so the serial peer receives
//! it as one framed line. Handy for exercising the downlink path against a
//! running bridge without the real application upstream.
//!
//! ## Usage
//!
//! ```bash
//! # Send a command line to the serial peer behind a bridge
//! send-command --topic fk/wh01/A/fl01/dev/cmd --payload '{"cmd":"goto","x":3.0,"y":4.0}'
//!
//! # Against a non-local broker
//! send-command --broker-host broker.example.com --broker-port 1883 \
//!   --topic fk/wh01/A/fl01/dev/cmd --payload '{"cmd":"stop"}'
//! ```

use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::time::{timeout, Duration};

#[derive(Parser)]
#[command(
    name = "send-command",
    about = "Publish a payload to a bridge's command topic"
)]
struct Args {
    /// Command topic the target bridge subscribes to
    #[arg(long, required = true)]
    topic: String,

    /// Payload to publish (one JSON object, sent as-is)
    #[arg(long, required = true)]
    payload: String,

    /// MQTT broker host
    #[arg(long, default_value = "localhost")]
    broker_host: String,

    /// MQTT broker port
    #[arg(long, default_value = "1883")]
    broker_port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let client_id = format!("send-command-{}", std::process::id());
    let mut options = MqttOptions::new(client_id, &args.broker_host, args.broker_port);
    options.set_keep_alive(Duration::from_secs(5));

    let (client, mut event_loop) = AsyncClient::new(options, 10);

    client
        .publish(&args.topic, QoS::AtLeastOnce, false, args.payload.clone())
        .await?;

    // Drive the event loop until the publish is acknowledged (or give up).
    let wait = timeout(Duration::from_secs(5), async {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::PubAck(_))) => break Ok(()),
                Ok(_) => continue,
                Err(e) => break Err(e),
            }
        }
    })
    .await;

    match wait {
        Ok(Ok(())) => {
            println!("published to {}", args.topic);
            client.disconnect().await?;
            Ok(())
        }
        Ok(Err(e)) => Err(format!("broker connection failed: {e}").into()),
        Err(_) => Err("timed out waiting for publish acknowledgment".into()),
    }
}
