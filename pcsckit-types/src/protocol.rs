//! Card transmission protocols

use std::fmt;

use bitflags::bitflags;

use crate::error::{Error, Result};

/// Protocol negotiated with a card
///
/// `Raw` is reserved: neither pcsc-lite nor Winscard accept it any more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Undefined,

    /// Same wire value as `Undefined`, kept for older callers
    Unset,

    /// T=0 protocol
    T0,

    /// T=1 protocol
    T1,

    /// For memory cards
    Raw,
}

impl Protocol {
    pub const RAW_UNDEFINED: u32 = 0x0000;
    pub const RAW_T0: u32 = 0x0001;
    pub const RAW_T1: u32 = 0x0002;
    pub const RAW_RAW: u32 = 0x0004;

    /// Wire value (`SCARD_PROTOCOL_*`)
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::Undefined | Self::Unset => Self::RAW_UNDEFINED,
            Self::T0 => Self::RAW_T0,
            Self::T1 => Self::RAW_T1,
            Self::Raw => Self::RAW_RAW,
        }
    }

    /// Decode a wire value; `0` always decodes as `Undefined`
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            Self::RAW_UNDEFINED => Some(Self::Undefined),
            Self::RAW_T0 => Some(Self::T0),
            Self::RAW_T1 => Some(Self::T1),
            Self::RAW_RAW => Some(Self::Raw),
            _ => None,
        }
    }

    pub const fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined | Self::Unset)
    }
}

impl TryFrom<u32> for Protocol {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        Self::from_raw(raw).ok_or(Error::UnknownProtocol(raw))
    }
}

impl From<Protocol> for u32 {
    fn from(protocol: Protocol) -> Self {
        protocol.to_raw()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined | Self::Unset => write!(f, "undefined"),
            Self::T0 => write!(f, "T=0"),
            Self::T1 => write!(f, "T=1"),
            Self::Raw => write!(f, "raw"),
        }
    }
}

bitflags! {
    /// Set of acceptable protocols offered on connect/reconnect
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Protocols: u32 {
        const T0 = Protocol::RAW_T0;
        const T1 = Protocol::RAW_T1;
        const RAW = Protocol::RAW_RAW;
    }
}

impl Protocols {
    /// T=0 or T=1, whichever the card prefers
    pub const ANY: Self = Self::T0.union(Self::T1);

    pub fn contains_protocol(self, protocol: Protocol) -> bool {
        !protocol.is_undefined() && self.bits() & protocol.to_raw() != 0
    }
}

impl Default for Protocols {
    fn default() -> Self {
        Self::ANY
    }
}

impl From<Protocol> for Protocols {
    fn from(protocol: Protocol) -> Self {
        Self::from_bits_truncate(protocol.to_raw())
    }
}

impl FromIterator<Protocol> for Protocols {
    fn from_iter<I: IntoIterator<Item = Protocol>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |acc, protocol| acc | Self::from(protocol))
    }
}
