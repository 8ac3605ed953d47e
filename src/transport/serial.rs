//! Serial port link to the compute module
//!
//! Thin wrapper over tokio-serial: a non-blocking drain for the uplink byte
//! stream and a newline-framed write for downlink commands.

use crate::transport::SerialLink;
use tokio::io::AsyncWriteExt;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::info;

pub struct SerialPortLink {
    stream: SerialStream,
}

impl SerialPortLink {
    /// Open the configured port at a fixed baud rate.
    pub fn open(path: &str, baud: u32) -> Result<Self, tokio_serial::Error> {
        let stream = tokio_serial::new(path, baud).open_native_async()?;
        info!(port = path, baud, "serial port opened");
        Ok(Self { stream })
    }
}

#[async_trait::async_trait]
impl SerialLink for SerialPortLink {
    fn read_available(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.stream.try_read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }

    async fn write_line(&mut self, payload: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(payload).await?;
        self.stream.write_all(b"\n").await?;
        self.stream.flush().await
    }
}
