//! Transmit modes

use std::fmt;

/// How [`crate::Unit::transmit`] treats the bytes it is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransceiveMode {
    /// Bytes go to the card unchanged and come back unchanged
    #[default]
    Raw,

    /// Bytes are wrapped and unwrapped by the reader's driver
    Direct,
}

impl fmt::Display for TransceiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Direct => write!(f, "direct"),
        }
    }
}
