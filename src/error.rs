//! Error types and handling.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum StationError {
    /// Card sector authentication failed (Key A rejected or no card selected)
    #[error("card authentication failed for block {block}")]
    CardAuth { block: u8 },

    /// Card block read failed after successful authentication
    #[error("card read failed for block {block}")]
    CardRead { block: u8 },

    /// Card block write failed after successful authentication
    #[error("card write failed for block {block}")]
    CardWrite { block: u8 },

    /// WiFi module reported an explicit ERROR marker
    #[error("wifi module error: {0}")]
    LinkError(String),

    /// Network association failed after all attempts
    #[error("wifi association failed after {attempts} attempts")]
    ConnectExhausted { attempts: u32 },

    /// RC522 self-test failed at startup (version byte 0x00 or 0xFF)
    #[error("card reader not detected (version byte {0:#04x})")]
    ReaderAbsent(u8),

    /// Blocking wait interrupted by the shutdown signal
    #[error("operation cancelled")]
    Cancelled,

    /// Stream I/O error on the modem link or console
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for StationError
pub type Result<T> = std::result::Result<T, StationError>;
