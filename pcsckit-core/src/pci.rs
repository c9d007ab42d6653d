//! Protocol control information for transmit calls

use std::fmt;
use std::mem::size_of;

use pcsckit_types::Protocol;

use crate::{Code, ScardError};

/// Header of an `SCARD_IO_REQUEST`
///
/// `length` covers the header itself plus any protocol-specific trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pci {
    pub protocol: Protocol,
    pub length: usize,
}

#[cfg(target_os = "macos")]
type Dword = u32;
#[cfg(not(target_os = "macos"))]
type Dword = std::os::raw::c_ulong;

impl Pci {
    /// Size of a bare `SCARD_IO_REQUEST` on this platform
    pub const HEADER_LENGTH: usize = 2 * size_of::<Dword>();

    pub const T0: Self = Self::new(Protocol::T0);
    pub const T1: Self = Self::new(Protocol::T1);
    pub const RAW: Self = Self::new(Protocol::Raw);

    const fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            length: Self::HEADER_LENGTH,
        }
    }

    /// Descriptor governing transmits under `protocol`
    ///
    /// Only T=0, T=1 and raw are connectable; anything else is a protocol
    /// mismatch.
    pub fn for_protocol(protocol: Protocol) -> Result<Self, ScardError> {
        match protocol {
            Protocol::T0 => Ok(Self::T0),
            Protocol::T1 => Ok(Self::T1),
            Protocol::Raw => Ok(Self::RAW),
            Protocol::Undefined | Protocol::Unset => Err(ScardError::new(Code::ProtoMismatch)),
        }
    }
}

impl fmt::Display for Pci {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PCI[{}, {} bytes]", self.protocol, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectable_protocols() {
        assert_eq!(Pci::for_protocol(Protocol::T0), Ok(Pci::T0));
        assert_eq!(Pci::for_protocol(Protocol::T1), Ok(Pci::T1));
        assert_eq!(Pci::for_protocol(Protocol::Raw), Ok(Pci::RAW));
        assert_eq!(Pci::T1.length, Pci::HEADER_LENGTH);
    }

    #[test]
    fn test_unconnectable_protocols() {
        for protocol in [Protocol::Undefined, Protocol::Unset] {
            let err = Pci::for_protocol(protocol).unwrap_err();
            assert_eq!(err.code(), Code::ProtoMismatch);
        }
    }
}
