//! In-memory reader for tests; one card, one block.

use super::reader::TagReader;
use super::session::{AuthKey, BLOCK_LEN};
use crate::error::{Result, StationError};

pub(crate) struct MockReader {
    pub block: [u8; BLOCK_LEN],
    pub present: bool,
    pub fail_auth: bool,
    pub fail_read: bool,
    pub fail_write: bool,
    pub halts: u32,
    pub stops: u32,
}

impl Default for MockReader {
    fn default() -> Self {
        Self {
            block: [0u8; BLOCK_LEN],
            present: false,
            fail_auth: false,
            fail_read: false,
            fail_write: false,
            halts: 0,
            stops: 0,
        }
    }
}

impl MockReader {
    /// Card on the reader with the given block contents.
    pub fn with_card(block: [u8; BLOCK_LEN]) -> Self {
        Self {
            block,
            present: true,
            ..Self::default()
        }
    }
}

impl TagReader for MockReader {
    fn probe(&mut self) -> bool {
        self.present
    }

    fn authenticate(&mut self, block: u8, _key: &AuthKey) -> Result<()> {
        if self.fail_auth {
            Err(StationError::CardAuth { block })
        } else {
            Ok(())
        }
    }

    fn read_block(&mut self, block: u8) -> Result<[u8; BLOCK_LEN]> {
        if self.fail_read {
            Err(StationError::CardRead { block })
        } else {
            Ok(self.block)
        }
    }

    fn write_block(&mut self, block: u8, data: [u8; BLOCK_LEN]) -> Result<()> {
        if self.fail_write {
            Err(StationError::CardWrite { block })
        } else {
            self.block = data;
            Ok(())
        }
    }

    fn halt(&mut self) {
        self.halts += 1;
    }

    fn stop_crypto(&mut self) {
        self.stops += 1;
    }
}
