//! Hardware conditions raised by the resource manager

use std::fmt;

use crate::code::Code;

/// A non-success PC/SC result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub struct ScardError {
    code: Code,
}

impl ScardError {
    pub const fn new(code: Code) -> Self {
        Self { code }
    }

    pub const fn code(&self) -> Code {
        self.code
    }

    /// Check if the condition is transient (retry might succeed)
    pub fn is_transient(&self) -> bool {
        matches!(
            self.code,
            Code::Timeout
                | Code::SharingViolation
                | Code::NoSmartcard
                | Code::RemovedCard
                | Code::ResetCard
                | Code::NotReady
                | Code::CommDataLost
                | Code::ServerTooBusy
        )
    }

    /// Check if the card handle is no longer usable
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self.code,
            Code::RemovedCard | Code::ResetCard | Code::UnpoweredCard | Code::InvalidHandle
        )
    }
}

impl fmt::Display for ScardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC/SC Error: 0x{:X} - {}",
            self.code.to_raw(),
            self.code.description()
        )
    }
}

impl From<Code> for ScardError {
    fn from(code: Code) -> Self {
        Self::new(code)
    }
}

/// Interpret a raw result code
///
/// `0` is success and yields `None`. Any other value yields a condition;
/// values outside the known set become [`Code::UnknownError`].
pub fn interpret(raw: u32) -> Option<ScardError> {
    if raw == 0 {
        return None;
    }

    let code = Code::from_raw(raw).unwrap_or_else(|| {
        tracing::trace!("Unrecognized PC/SC result 0x{:08X}", raw);
        Code::UnknownError
    });

    Some(ScardError::new(code))
}

/// Turn a raw result code into a `Result`
pub fn check(raw: u32) -> Result<(), ScardError> {
    match interpret(raw) {
        None => Ok(()),
        Some(error) => Err(error),
    }
}
