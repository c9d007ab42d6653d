//! Opaque handles handed out by the resource manager

use std::fmt;

/// Handle to one resource manager context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u64);

/// Handle to one open connection to a card
///
/// Valid until the card is removed, its context is released or it is
/// disconnected. Any later use fails with a hardware condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardHandle(pub u64);

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hContext(0x{:X})", self.0)
    }
}

impl fmt::Display for CardHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hCard(0x{:X})", self.0)
    }
}
