//! Reader attribute identifiers
//!
//! Only the attributes readers commonly implement are listed; the raw
//! value is `SCARD_ATTR_VALUE(class, tag)`.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Attribute {
    // Vendor information
    VendorName = 0x0001_0100,
    VendorIfdType = 0x0001_0101,
    VendorIfdVersion = 0x0001_0102,
    VendorIfdSerialNo = 0x0001_0103,

    // Communications
    ChannelId = 0x0002_0110,

    // IFD protocol
    CurrentProtocolType = 0x0008_0201,

    // ICC state
    AtrString = 0x0009_0303,
}

impl Attribute {
    pub const fn to_raw(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Attribute {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        match raw {
            0x0001_0100 => Ok(Self::VendorName),
            0x0001_0101 => Ok(Self::VendorIfdType),
            0x0001_0102 => Ok(Self::VendorIfdVersion),
            0x0001_0103 => Ok(Self::VendorIfdSerialNo),
            0x0002_0110 => Ok(Self::ChannelId),
            0x0008_0201 => Ok(Self::CurrentProtocolType),
            0x0009_0303 => Ok(Self::AtrString),
            _ => Err(Error::UnsupportedAttribute(raw)),
        }
    }
}
