//! High-level error types

use std::error::Error as StdError;

use pcsckit_core::{Code, ScardError};

pub type Result<T> = std::result::Result<T, ReaderError>;

/// Boxed failure raised by a peripheral driver hook
pub type DriverError = Box<dyn StdError + Send + Sync>;

/// What went wrong, by origin
///
/// `Hardware` is anything the resource manager reported, `Apdu` is a card
/// answering with a failure, and `Driver` is a wrap/unwrap hook rejecting
/// the bytes for its own reasons.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("Hardware error: {0}")]
    Hardware(#[from] ScardError),

    #[error("APDU error: {0}")]
    Apdu(#[from] pcsckit_core::Error),

    #[error("Driver error: {0}")]
    Driver(DriverError),
}

impl ReaderError {
    /// Classify a driver hook failure
    ///
    /// APDU-level failures keep their own branch so a bad status word is
    /// reported the same way whichever driver unwrapped it.
    pub fn from_driver(error: DriverError) -> Self {
        match error.downcast::<pcsckit_core::Error>() {
            Ok(apdu) => Self::Apdu(*apdu),
            Err(other) => Self::Driver(other),
        }
    }

    /// Result code of a hardware failure
    pub fn code(&self) -> Option<Code> {
        match self {
            Self::Hardware(error) => Some(error.code()),
            _ => None,
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::Hardware(_))
    }

    pub fn is_apdu(&self) -> bool {
        matches!(self, Self::Apdu(_))
    }

    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver(_))
    }

    /// Check if retrying the same operation might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Hardware(error) => error.is_transient(),
            _ => false,
        }
    }
}

impl From<Code> for ReaderError {
    fn from(code: Code) -> Self {
        Self::Hardware(ScardError::new(code))
    }
}
