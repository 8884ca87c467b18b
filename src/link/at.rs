//! AT command exchange over the modem byte-stream.

use crate::error::Result;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};

/// Raw modem response collected within one wait window.
///
/// Classification is a substring search, per AT ecosystem convention: the
/// marker can appear anywhere in the buffer, interleaved with echoes and
/// link-status chatter. Callers treat a response with neither marker as
/// failure-equivalent.
#[derive(Debug, Clone)]
pub struct AtResponse {
    text: String,
}

impl AtResponse {
    pub(crate) fn from_bytes(raw: &[u8]) -> Self {
        Self {
            text: String::from_utf8_lossy(raw).into_owned(),
        }
    }

    /// Success marker anywhere in the buffer.
    pub fn is_ok(&self) -> bool {
        self.text.contains("OK")
    }

    /// Explicit failure marker anywhere in the buffer.
    pub fn is_error(&self) -> bool {
        self.text.contains("ERROR")
    }

    /// Nothing arrived within the window.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Command/response channel to the WiFi module.
///
/// No queuing and no retransmission here; every retry is orchestrated by
/// the caller.
pub struct AtChannel<S> {
    stream: S,
}

impl<S: AsyncRead + AsyncWrite + Unpin> AtChannel<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Send one command line and collect everything the module says until
    /// the window closes. An empty response is not an error at this layer.
    pub async fn send(&mut self, command: &str, wait: Duration) -> Result<AtResponse> {
        debug!(command, "AT tx");
        self.stream.write_all(command.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;

        let raw = self.drain_until(Instant::now() + wait).await?;
        let response = AtResponse::from_bytes(&raw);
        trace!(response = response.text(), "AT rx");
        Ok(response)
    }

    /// Write bytes verbatim with no response collection (HTTP payload path).
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Accumulate received bytes until the deadline. Markers can arrive late,
    /// so the full window is consumed even after an early "OK".
    async fn drain_until(&mut self, deadline: Instant) -> Result<Vec<u8>> {
        let mut collected = Vec::new();
        let mut chunk = [0u8; 256];
        while Instant::now() < deadline {
            match timeout_at(deadline, self.stream.read(&mut chunk)).await {
                // Stream closed; nothing more arrives this window.
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => collected.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(e.into()),
                // Window elapsed.
                Err(_) => break,
            }
        }
        Ok(collected)
    }
}
