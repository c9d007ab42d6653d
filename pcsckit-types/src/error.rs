//! Raw value conversion errors

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Unknown protocol 0x{0:04X}")]
    UnknownProtocol(u32),

    #[error("Unsupported attribute 0x{0:08X}")]
    UnsupportedAttribute(u32),
}
