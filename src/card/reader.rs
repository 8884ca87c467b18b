//! Reader hardware access behind the `TagReader` seam.

use super::session::{AuthKey, BLOCK_LEN};
use crate::error::{Result, StationError};
use mfrc522::comm::Interface;
use mfrc522::{Initialized, Mfrc522, Uid};
use tracing::{debug, info};

/// Narrow contract over the card reader.
///
/// Mirrors the transaction primitives the station needs; everything below
/// (REQA, anti-collision, CRC) belongs to the implementation.
pub trait TagReader {
    /// Probe for a card and read its serial. True once a card is selected.
    fn probe(&mut self) -> bool;

    /// Authenticate `block` with Key A against the selected card.
    fn authenticate(&mut self, block: u8, key: &AuthKey) -> Result<()>;

    /// Read the 16 payload bytes of `block`. The underlying transfer moves
    /// 18 bytes; the 2-byte trailer never leaves the driver.
    fn read_block(&mut self, block: u8) -> Result<[u8; BLOCK_LEN]>;

    /// Write the 16 payload bytes of `block`.
    fn write_block(&mut self, block: u8, data: [u8; BLOCK_LEN]) -> Result<()>;

    /// Park the card until it is re-presented.
    fn halt(&mut self);

    /// Clear the crypto unit state left by authentication.
    fn stop_crypto(&mut self);
}

/// RC522 implementation over the `mfrc522` driver.
pub struct Rc522Reader<COMM: Interface> {
    mfrc: Mfrc522<COMM, Initialized>,
    uid: Option<Uid>,
}

impl<COMM: Interface> Rc522Reader<COMM> {
    /// Wrap an initialized driver, verifying the chip is actually wired up.
    ///
    /// A version byte of 0x00 or 0xFF means the bus reads float and no
    /// reader is present; the station cannot do anything useful without one.
    pub fn new(mut mfrc: Mfrc522<COMM, Initialized>) -> Result<Self> {
        let version = mfrc.version().map_err(|_| StationError::ReaderAbsent(0x00))?;
        if version == 0x00 || version == 0xFF {
            return Err(StationError::ReaderAbsent(version));
        }
        info!("RC522 detected, version {version:#04x}");
        Ok(Self { mfrc, uid: None })
    }
}

impl<COMM: Interface> TagReader for Rc522Reader<COMM> {
    fn probe(&mut self) -> bool {
        // No answer to REQA is the normal idle state, not an error.
        let Ok(atqa) = self.mfrc.reqa() else {
            return false;
        };
        match self.mfrc.select(&atqa) {
            Ok(uid) => {
                debug!("card selected: {:02X?}", uid.as_bytes());
                self.uid = Some(uid);
                true
            }
            Err(_) => false,
        }
    }

    fn authenticate(&mut self, block: u8, key: &AuthKey) -> Result<()> {
        let uid = self.uid.as_ref().ok_or(StationError::CardAuth { block })?;
        self.mfrc
            .mf_authenticate(uid, block, key.bytes())
            .map_err(|_| StationError::CardAuth { block })
    }

    fn read_block(&mut self, block: u8) -> Result<[u8; BLOCK_LEN]> {
        self.mfrc.mf_read(block).map_err(|_| StationError::CardRead { block })
    }

    fn write_block(&mut self, block: u8, data: [u8; BLOCK_LEN]) -> Result<()> {
        self.mfrc
            .mf_write(block, data)
            .map_err(|_| StationError::CardWrite { block })
    }

    fn halt(&mut self) {
        if self.mfrc.hlta().is_err() {
            debug!("HLTA not acknowledged");
        }
        self.uid = None;
    }

    fn stop_crypto(&mut self) {
        if self.mfrc.stop_crypto1().is_err() {
            debug!("StopCrypto1 failed");
        }
    }
}
