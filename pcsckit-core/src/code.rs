//! PC/SC result codes
//!
//! Every non-success `SCARD_*` result maps to exactly one [`Code`]. The set
//! is closed: unrecognized values are folded into [`Code::UnknownError`] by
//! [`crate::interpret`].

use std::fmt;

/// Named PC/SC failure condition
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Code {
    InternalError = 0x8010_0001,
    Cancelled = 0x8010_0002,
    InvalidHandle = 0x8010_0003,
    InvalidParameter = 0x8010_0004,
    InvalidTarget = 0x8010_0005,
    NoMemory = 0x8010_0006,
    WaitedTooLong = 0x8010_0007,
    InsufficientBuffer = 0x8010_0008,
    UnknownReader = 0x8010_0009,
    Timeout = 0x8010_000A,
    SharingViolation = 0x8010_000B,
    NoSmartcard = 0x8010_000C,
    UnknownCard = 0x8010_000D,
    CantDispose = 0x8010_000E,
    ProtoMismatch = 0x8010_000F,
    NotReady = 0x8010_0010,
    InvalidValue = 0x8010_0011,
    SystemCancelled = 0x8010_0012,
    CommError = 0x8010_0013,
    UnknownError = 0x8010_0014,
    InvalidAtr = 0x8010_0015,
    NotTransacted = 0x8010_0016,
    ReaderUnavailable = 0x8010_0017,
    Shutdown = 0x8010_0018,
    PciTooSmall = 0x8010_0019,
    ReaderUnsupported = 0x8010_001A,
    DuplicateReader = 0x8010_001B,
    CardUnsupported = 0x8010_001C,
    NoService = 0x8010_001D,
    ServiceStopped = 0x8010_001E,
    Unexpected = 0x8010_001F,
    IccInstallation = 0x8010_0020,
    IccCreateOrder = 0x8010_0021,
    UnsupportedFeature = 0x8010_0022,
    DirNotFound = 0x8010_0023,
    FileNotFound = 0x8010_0024,
    NoDir = 0x8010_0025,
    NoFile = 0x8010_0026,
    NoAccess = 0x8010_0027,
    WriteTooMany = 0x8010_0028,
    BadSeek = 0x8010_0029,
    InvalidChv = 0x8010_002A,
    UnknownResMng = 0x8010_002B,
    NoSuchCertificate = 0x8010_002C,
    CertificateUnavailable = 0x8010_002D,
    NoReadersAvailable = 0x8010_002E,
    CommDataLost = 0x8010_002F,
    NoKeyContainer = 0x8010_0030,
    ServerTooBusy = 0x8010_0031,

    // Warnings
    UnsupportedCard = 0x8010_0065,
    UnresponsiveCard = 0x8010_0066,
    UnpoweredCard = 0x8010_0067,
    ResetCard = 0x8010_0068,
    RemovedCard = 0x8010_0069,
    SecurityViolation = 0x8010_006A,
    WrongChv = 0x8010_006B,
    ChvBlocked = 0x8010_006C,
    Eof = 0x8010_006D,
    CancelledByUser = 0x8010_006E,
    CardNotAuthenticated = 0x8010_006F,
}

impl Code {
    /// Every code, in ascending numeric order
    pub const ALL: [Self; 60] = [
        Self::InternalError,
        Self::Cancelled,
        Self::InvalidHandle,
        Self::InvalidParameter,
        Self::InvalidTarget,
        Self::NoMemory,
        Self::WaitedTooLong,
        Self::InsufficientBuffer,
        Self::UnknownReader,
        Self::Timeout,
        Self::SharingViolation,
        Self::NoSmartcard,
        Self::UnknownCard,
        Self::CantDispose,
        Self::ProtoMismatch,
        Self::NotReady,
        Self::InvalidValue,
        Self::SystemCancelled,
        Self::CommError,
        Self::UnknownError,
        Self::InvalidAtr,
        Self::NotTransacted,
        Self::ReaderUnavailable,
        Self::Shutdown,
        Self::PciTooSmall,
        Self::ReaderUnsupported,
        Self::DuplicateReader,
        Self::CardUnsupported,
        Self::NoService,
        Self::ServiceStopped,
        Self::Unexpected,
        Self::IccInstallation,
        Self::IccCreateOrder,
        Self::UnsupportedFeature,
        Self::DirNotFound,
        Self::FileNotFound,
        Self::NoDir,
        Self::NoFile,
        Self::NoAccess,
        Self::WriteTooMany,
        Self::BadSeek,
        Self::InvalidChv,
        Self::UnknownResMng,
        Self::NoSuchCertificate,
        Self::CertificateUnavailable,
        Self::NoReadersAvailable,
        Self::CommDataLost,
        Self::NoKeyContainer,
        Self::ServerTooBusy,
        Self::UnsupportedCard,
        Self::UnresponsiveCard,
        Self::UnpoweredCard,
        Self::ResetCard,
        Self::RemovedCard,
        Self::SecurityViolation,
        Self::WrongChv,
        Self::ChvBlocked,
        Self::Eof,
        Self::CancelledByUser,
        Self::CardNotAuthenticated,
    ];

    /// Stable numeric value
    pub const fn to_raw(self) -> u32 {
        self as u32
    }

    /// Look up the code for a raw result, if it is one of the known values
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|code| code.to_raw() == raw)
    }

    /// Fixed human-readable description
    pub const fn description(self) -> &'static str {
        match self {
            Self::InternalError => "An internal consistency check failed",
            Self::Cancelled => "The action was cancelled by an SCardCancel request",
            Self::InvalidHandle => "The supplied handle was invalid",
            Self::InvalidParameter => "One or more of the supplied parameters could not be properly interpreted",
            Self::InvalidTarget => "Registry startup information is missing or invalid",
            Self::NoMemory => "Not enough memory available to complete this command",
            Self::WaitedTooLong => "An internal consistency timer has expired",
            Self::InsufficientBuffer => "The data buffer to receive returned data is too small for the returned data",
            Self::UnknownReader => "The specified reader name is not recognized",
            Self::Timeout => "The user-specified timeout value has expired",
            Self::SharingViolation => "The smart card cannot be accessed because of other connections outstanding",
            Self::NoSmartcard => "The operation requires a Smart Card, but no Smart Card is currently in the device",
            Self::UnknownCard => "The specified smart card name is not recognized",
            Self::CantDispose => "The system could not dispose of the media in the requested manner",
            Self::ProtoMismatch => "The requested protocols are incompatible with the protocol currently in use with the smart card",
            Self::NotReady => "The reader or smart card is not ready to accept commands",
            Self::InvalidValue => "One or more of the supplied parameters values could not be properly interpreted",
            Self::SystemCancelled => "The action was cancelled by the system, presumably to log off or shut down",
            Self::CommError => "An internal communications error has been detected",
            Self::UnknownError => "An internal error has been detected, but the source is unknown",
            Self::InvalidAtr => "An ATR obtained from the registry is not a valid ATR string",
            Self::NotTransacted => "An attempt was made to end a non-existent transaction",
            Self::ReaderUnavailable => "The specified reader is not currently available for use",
            Self::Shutdown => "The operation has been aborted to allow the server application to exit",
            Self::PciTooSmall => "The PCI Receive buffer was too small",
            Self::ReaderUnsupported => "The reader driver does not meet minimal requirements for support",
            Self::DuplicateReader => "The reader driver did not produce a unique reader name",
            Self::CardUnsupported => "The smart card does not meet minimal requirements for support",
            Self::NoService => "The Smart card resource manager is not running",
            Self::ServiceStopped => "The Smart card resource manager has shut down",
            Self::Unexpected => "An unexpected card error has occurred",
            Self::IccInstallation => "No primary provider can be found for the smart card",
            Self::IccCreateOrder => "The requested order of object creation is not supported",
            Self::UnsupportedFeature => "This smart card does not support the requested feature",
            Self::DirNotFound => "The identified directory does not exist in the smart card",
            Self::FileNotFound => "The identified file does not exist in the smart card",
            Self::NoDir => "The supplied path does not represent a smart card directory",
            Self::NoFile => "The supplied path does not represent a smart card file",
            Self::NoAccess => "Access is denied to this file",
            Self::WriteTooMany => "The smart card does not have enough memory to store the information",
            Self::BadSeek => "There was an error trying to set the smart card file object pointer",
            Self::InvalidChv => "The supplied PIN is incorrect",
            Self::UnknownResMng => "An unrecognized error code was returned from a layered component",
            Self::NoSuchCertificate => "The requested certificate does not exist",
            Self::CertificateUnavailable => "The requested certificate could not be obtained",
            Self::NoReadersAvailable => "Cannot find a smart card reader",
            Self::CommDataLost => "A communications error with the smart card has been detected. Retry the operation",
            Self::NoKeyContainer => "The requested key container does not exist on the smart card",
            Self::ServerTooBusy => "The Smart Card Resource Manager is too busy to complete this operation",
            Self::UnsupportedCard => "The reader cannot communicate with the card, due to ATR string configuration conflicts",
            Self::UnresponsiveCard => "The smart card is not responding to a reset",
            Self::UnpoweredCard => "Power has been removed from the smart card, so that further communication is not possible",
            Self::ResetCard => "The smart card has been reset, so any shared state information is invalid",
            Self::RemovedCard => "The smart card has been removed, so further communication is not possible",
            Self::SecurityViolation => "Access was denied because of a security violation",
            Self::WrongChv => "The card cannot be accessed because the wrong PIN was presented",
            Self::ChvBlocked => "The card cannot be accessed because the maximum number of PIN entry attempts has been reached",
            Self::Eof => "The end of the smart card file has been reached",
            Self::CancelledByUser => "The user pressed 'Cancel' on a Smart Card Selection Dialog",
            Self::CardNotAuthenticated => "No PIN was presented to the smart card",
        }
    }
}

impl From<Code> for u32 {
    fn from(code: Code) -> Self {
        code.to_raw()
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_code_from_raw() {
        assert_eq!(Code::from_raw(0x8010_000A), Some(Code::Timeout));
        assert_eq!(Code::from_raw(0x8010_0069), Some(Code::RemovedCard));
        assert_eq!(Code::from_raw(0x8010_0050), None);
        assert_eq!(Code::from_raw(0), None);
    }

    #[test]
    fn test_codes_are_unique() {
        let raw: HashSet<u32> = Code::ALL.iter().map(|c| c.to_raw()).collect();
        assert_eq!(raw.len(), Code::ALL.len());
    }

    #[test]
    fn test_all_codes_round_trip() {
        for code in Code::ALL {
            assert_eq!(Code::from_raw(code.to_raw()), Some(code));
            assert!(!code.description().is_empty());
        }
    }
}
