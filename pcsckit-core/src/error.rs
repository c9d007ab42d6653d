//! Error types for pcsckit-core
//!
//! These are application-protocol failures: they describe what the card
//! answered, never what the reader hardware did.

use crate::status::StatusWord;

/// Result type alias for APDU operations
pub type Result<T> = std::result::Result<T, Error>;

/// APDU-level errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Response is too short to carry a status word
    #[error("Response too short: expected at least 2 bytes, got {actual} bytes")]
    ResponseTooShort {
        actual: usize,
    },

    /// Card answered with a non-success status word
    #[error("Card returned status {status}: {}", status.description())]
    Status {
        status: StatusWord,
    },

    /// Command data does not fit the selected encoding
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// ATR pattern and mask disagree in length
    #[error("Invalid ATR pattern: {0}")]
    InvalidAtrPattern(String),
}

impl Error {
    /// Status word carried by a `Status` error
    pub fn status(&self) -> Option<StatusWord> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }
}
