//! Session management for the serial-attached ESP-01 WiFi modem.
//!
//! The modem speaks newline-terminated AT commands and answers with raw byte
//! echoes carrying informal "OK"/"ERROR" markers. There is no framing; every
//! exchange is bounded by a wait window.

mod at;
mod wifi;


// Re-export public API
pub use at::{AtChannel, AtResponse};
pub use wifi::{LinkTiming, WifiLink};
