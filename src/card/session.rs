//! Card transaction lifecycle over one fixed data block.

use super::reader::TagReader;
use crate::error::{Result, StationError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::info;

/// Payload bytes per data block.
pub const BLOCK_LEN: usize = 16;

/// Interval between presence probes while waiting for a tag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Six-byte sector secret (Key A). The station uses the manufacturer
/// default, all 0xFF; it is fixed at construction and shared by every
/// transaction.
#[derive(Debug, Clone, Copy)]
pub struct AuthKey([u8; 6]);

impl AuthKey {
    pub const fn bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl Default for AuthKey {
    fn default() -> Self {
        Self([0xFF; 6])
    }
}

/// Mediates all interaction with the card present on the reader at call time.
pub struct CardSession<R> {
    reader: R,
    block: u8,
    key: AuthKey,
}

impl<R: TagReader> CardSession<R> {
    pub fn new(reader: R, block: u8) -> Self {
        Self {
            reader,
            block,
            key: AuthKey::default(),
        }
    }

    /// Block until a card is detected and its serial read, or the shutdown
    /// signal fires. There is no deadline; a card can take arbitrarily long
    /// to show up.
    pub async fn wait_for_card(&mut self, cancel: &mut watch::Receiver<bool>) -> Result<()> {
        println!("Present a tag...");
        loop {
            if self.reader.probe() {
                return Ok(());
            }
            tokio::select! {
                _ = sleep(POLL_INTERVAL) => {}
                _ = cancel.changed() => return Err(StationError::Cancelled),
            }
        }
    }

    /// Read the product identifier stored on the block.
    ///
    /// An erased or blank block yields an empty identifier; callers must
    /// treat that as "nothing to post".
    pub async fn read_product_id(&mut self, cancel: &mut watch::Receiver<bool>) -> Result<String> {
        self.wait_for_card(cancel).await?;

        // A failed authentication leaves the card un-halted; the tag answers
        // the next REQA without being re-presented. See DESIGN.md.
        self.reader.authenticate(self.block, &self.key)?;

        let data = match self.reader.read_block(self.block) {
            Ok(data) => data,
            Err(e) => {
                self.finish();
                return Err(e);
            }
        };
        self.finish();

        let id = decode_payload(&data);
        info!(block = self.block, %id, "block read");
        Ok(id)
    }

    /// Store `text` on the block, truncated to 16 bytes and space-padded.
    pub async fn write_text(&mut self, text: &str, cancel: &mut watch::Receiver<bool>) -> Result<()> {
        self.write_payload(encode_payload(text), cancel).await
    }

    /// Overwrite the block with zeroes; a later read yields an empty id.
    pub async fn erase_block(&mut self, cancel: &mut watch::Receiver<bool>) -> Result<()> {
        self.write_payload([0u8; BLOCK_LEN], cancel).await
    }

    async fn write_payload(&mut self, payload: [u8; BLOCK_LEN], cancel: &mut watch::Receiver<bool>) -> Result<()> {
        self.wait_for_card(cancel).await?;

        self.reader.authenticate(self.block, &self.key)?;

        let result = self.reader.write_block(self.block, payload);
        self.finish();
        if result.is_ok() {
            info!(block = self.block, "block written");
        }
        result
    }

    /// Park the card and clear the crypto unit after an authenticated exchange.
    fn finish(&mut self) {
        self.reader.halt();
        self.reader.stop_crypto();
    }

    #[cfg(test)]
    pub(crate) fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }
}

/// Truncate to 16 bytes and right-pad with spaces (0x20).
pub fn encode_payload(text: &str) -> [u8; BLOCK_LEN] {
    let mut payload = [0x20u8; BLOCK_LEN];
    let bytes = text.as_bytes();
    let len = bytes.len().min(BLOCK_LEN);
    payload[..len].copy_from_slice(&bytes[..len]);
    payload
}

/// Decode leading ASCII up to the first NUL or space; the tail is padding
/// and stays undefined.
pub fn decode_payload(data: &[u8; BLOCK_LEN]) -> String {
    let end = data.iter().position(|&b| b == 0x00 || b == 0x20).unwrap_or(BLOCK_LEN);
    String::from_utf8_lossy(&data[..end]).into_owned()
}
