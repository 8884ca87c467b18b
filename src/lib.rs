pub mod card;
pub mod config;
pub mod error;
pub mod link;
pub mod station;

pub use error::{Result, StationError};
