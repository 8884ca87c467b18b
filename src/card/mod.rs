//! MIFARE Classic card transactions through the RC522 reader.
//!
//! One fixed data block carries the product identifier as space-padded ASCII.
//! The reader's anti-collision and modulation machinery stays inside the
//! driver crate behind the [`TagReader`] seam.

mod reader;
mod session;

#[cfg(test)]
pub(crate) mod mock;

// Re-export public API
pub use reader::{Rc522Reader, TagReader};
pub use session::{AuthKey, BLOCK_LEN, CardSession, decode_payload, encode_payload};
