//! ISO 7816-4 command APDU encoding

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::error::{Error, Result};

/// Command APDU
///
/// # Structure
///
/// ```text
/// ┌──────┬──────┬──────┬──────┬──────────┬──────────┬──────────┐
/// │ CLA  │ INS  │  P1  │  P2  │ Lc       │ Data     │ Le       │
/// │ 1 B  │ 1 B  │ 1 B  │ 1 B  │ 0/1/3 B  │ Lc bytes │ 0-3 B    │
/// └──────┴──────┴──────┴──────┴──────────┴──────────┴──────────┘
/// ```
///
/// Short encoding is used whenever data fits in 255 bytes and the
/// expected length is at most 256. Otherwise extended fields are emitted.
///
/// # Examples
///
/// ```
/// use pcsckit_core::Command;
///
/// // SELECT by AID
/// let select = Command::new(0x00, 0xA4, 0x04, 0x00)
///     .with_data(vec![0xA0, 0x00, 0x00, 0x00, 0x03])
///     .with_le(0);
/// assert_eq!(
///     select.encode().unwrap().as_ref(),
///     &[0x00, 0xA4, 0x04, 0x00, 0x05, 0xA0, 0x00, 0x00, 0x00, 0x03, 0x00]
/// );
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Bytes,
    /// Expected response length; `Some(0)` requests the maximum
    pub le: Option<u32>,
}

impl Command {
    pub const HEADER_SIZE: usize = 4;

    /// Largest payload an extended APDU can carry
    pub const MAX_EXTENDED_DATA: usize = 65535;

    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Bytes::new(),
            le: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    pub fn with_le(mut self, le: u32) -> Self {
        self.le = Some(le);
        self
    }

    /// Whether the extended length form is needed
    pub fn is_extended(&self) -> bool {
        self.data.len() > 255 || self.le.is_some_and(|le| le > 256)
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> Result<BytesMut> {
        if self.data.len() > Self::MAX_EXTENDED_DATA {
            return Err(Error::PayloadTooLarge {
                size: self.data.len(),
                max: Self::MAX_EXTENDED_DATA,
            });
        }
        if let Some(le) = self.le {
            if le > 65536 {
                return Err(Error::PayloadTooLarge {
                    size: le as usize,
                    max: 65536,
                });
            }
        }

        let extended = self.is_extended();
        let mut buf = BytesMut::with_capacity(Self::HEADER_SIZE + self.data.len() + 6);

        buf.put_u8(self.cla);
        buf.put_u8(self.ins);
        buf.put_u8(self.p1);
        buf.put_u8(self.p2);

        if !self.data.is_empty() {
            if extended {
                buf.put_u8(0x00);
                buf.put_u16(self.data.len() as u16);
            } else {
                buf.put_u8(self.data.len() as u8);
            }
            buf.put_slice(&self.data);
        }

        if let Some(le) = self.le {
            if extended {
                // Lc already carried the leading zero byte
                if self.data.is_empty() {
                    buf.put_u8(0x00);
                }
                // 65536 encodes as 0000
                buf.put_u16(if le == 65536 { 0 } else { le as u16 });
            } else {
                // 256 encodes as 00
                buf.put_u8(if le == 256 { 0 } else { le as u8 });
            }
        }

        Ok(buf)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("cla", &format_args!("0x{:02X}", self.cla))
            .field("ins", &format_args!("0x{:02X}", self.ins))
            .field("p1", &format_args!("0x{:02X}", self.p1))
            .field("p2", &format_args!("0x{:02X}", self.p2))
            .field("data", &hex::encode_upper(&self.data))
            .field("le", &self.le)
            .finish()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "APDU[{:02X} {:02X} {:02X} {:02X}, {} bytes]",
            self.cla,
            self.ins,
            self.p1,
            self.p2,
            self.data.len()
        )
    }
}
