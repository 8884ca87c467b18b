//! WiFi association and HTTP POST on top of the AT channel.

use super::at::AtChannel;
use crate::config::{ApiConfig, WifiConfig};
use crate::error::{Result, StationError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::sleep;
use tracing::{info, warn};

/// Reconnect attempts when the liveness probe finds the module silent.
const RECONNECT_ATTEMPTS: u32 = 3;

/// Slack added to the CIPSEND length over the body size. Inherited from the
/// deployed firmware; the module accepts the oversized allowance, so it
/// stays as-is. See DESIGN.md.
const SEND_LENGTH_SLACK: usize = 100;

/// Wait windows for the individual AT exchanges. Defaults match the
/// deployed fleet; tests shrink them.
#[derive(Debug, Clone)]
pub struct LinkTiming {
    /// Plain command echo window.
    pub command_wait: Duration,
    /// Window for CWJAP to report the association result.
    pub join_window: Duration,
    /// Pause between failed join attempts.
    pub retry_delay: Duration,
    /// Liveness probe window.
    pub probe_wait: Duration,
    /// Window for CIPSTART to open the TCP connection.
    pub open_wait: Duration,
    /// Pause after pushing the HTTP request, before closing.
    pub settle: Duration,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            command_wait: Duration::from_secs(2),
            join_window: Duration::from_secs(10),
            retry_delay: Duration::from_secs(2),
            probe_wait: Duration::from_millis(500),
            open_wait: Duration::from_secs(4),
            settle: Duration::from_secs(2),
        }
    }
}

/// Association and HTTP POST lifecycle over the AT channel.
///
/// Liveness between menu actions is otherwise untracked; the probe in
/// [`WifiLink::ensure_alive`] is the only signal the station has.
pub struct WifiLink<S> {
    channel: AtChannel<S>,
    wifi: WifiConfig,
    api: ApiConfig,
    timing: LinkTiming,
}

impl<S: AsyncRead + AsyncWrite + Unpin> WifiLink<S> {
    pub fn new(channel: AtChannel<S>, wifi: WifiConfig, api: ApiConfig) -> Self {
        Self {
            channel,
            wifi,
            api,
            timing: LinkTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: LinkTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Join the configured network, retrying up to `max_attempts` times
    /// with a fixed pause between attempts.
    pub async fn connect(&mut self, max_attempts: u32) -> Result<()> {
        for attempt in 1..=max_attempts {
            info!(attempt, max_attempts, ssid = %self.wifi.ssid, "joining wifi network");

            self.channel.send("AT", self.timing.command_wait).await?;
            self.channel.send("AT+CWMODE=1", self.timing.command_wait).await?;

            let join = format!("AT+CWJAP=\"{}\",\"{}\"", self.wifi.ssid, self.wifi.password);
            let response = self.channel.send(&join, self.timing.join_window).await?;

            if response.is_ok() {
                info!("wifi associated");
                return Ok(());
            }

            warn!(attempt, response = response.text(), "join failed");
            sleep(self.timing.retry_delay).await;
        }

        Err(StationError::ConnectExhausted { attempts: max_attempts })
    }

    /// Heuristic liveness check: a module that echoes nothing at all is
    /// treated as down and rejoined. Not a protocol-level keep-alive.
    pub async fn ensure_alive(&mut self) -> Result<()> {
        let response = self.channel.send("AT", self.timing.probe_wait).await?;
        if response.is_empty() {
            warn!("wifi module silent, reconnecting");
            self.connect(RECONNECT_ATTEMPTS).await?;
        }
        Ok(())
    }

    /// POST one product identifier to the rental API. An empty id is a
    /// guaranteed no-op. The response is never read back; delivery is
    /// fire-and-forget once the TCP session opens.
    pub async fn post_product(&mut self, product_id: &str) -> Result<()> {
        if product_id.is_empty() {
            return Ok(());
        }

        let body = request_body(self.api.locacao_id, product_id);
        println!("Posting to API: {body}");
        info!(%body, host = %self.api.host, "posting product");

        let open = format!("AT+CIPSTART=\"TCP\",\"{}\",{}", self.api.host, self.api.port);
        let response = self.channel.send(&open, self.timing.open_wait).await?;
        if response.is_error() {
            warn!("TCP open refused");
            return Err(StationError::LinkError(response.into_text()));
        }

        let allowance = body.len() + SEND_LENGTH_SLACK;
        self.channel
            .send(&format!("AT+CIPSEND={allowance}"), self.timing.command_wait)
            .await?;

        let request = build_request(&self.api.host, &self.api.path, &body);
        self.channel.write_raw(request.as_bytes()).await?;

        sleep(self.timing.settle).await;
        self.channel.send("AT+CIPCLOSE", self.timing.command_wait).await?;
        Ok(())
    }
}

/// Request body with the card text inserted verbatim. The id is not
/// validated as numeric; a non-numeric tag produces a body the API rejects.
pub(crate) fn request_body(locacao_id: u32, product_id: &str) -> String {
    format!("{{\"locacao_id\":{locacao_id},\"produto_id\":{product_id},\"qtde\":1}}")
}

/// Literal HTTP/1.1 request. Content-Length is the exact body size; the
/// CIPSEND allowance is the only place slack appears.
pub(crate) fn build_request(host: &str, path: &str, body: &str) -> String {
    format!(
        "POST {path} HTTP/1.1\r\nHost: {host}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}
