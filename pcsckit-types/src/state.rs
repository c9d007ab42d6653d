//! Reader and card state bit-sets

use bitflags::bitflags;

use crate::{MAX_ATR_SIZE, ReaderName};

bitflags! {
    /// Card state reported by `SCardStatus`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CardState: u32 {
        const UNKNOWN = 0x0001;

        /// There is no card in the reader
        const ABSENT = 0x0002;

        /// There is a card in the reader, but it has not been moved into position for use
        const PRESENT = 0x0004;

        /// There is a card in the reader in position for use. The card is not powered
        const SWALLOWED = 0x0008;

        /// Power is being provided to the card, but the reader driver is unaware of the mode of the card
        const POWERED = 0x0010;

        /// The card has been reset and is awaiting PTS negotiation
        const NEGOTIABLE = 0x0020;

        /// The card has been reset and specific communication protocols have been established
        const SPECIFIC = 0x0040;
    }
}

bitflags! {
    /// Reader state used by `SCardGetStatusChange`
    ///
    /// The resource manager guarantees a few implications between bits:
    /// `UNKNOWN` comes with `CHANGED` and `IGNORE`, and `UNAVAILABLE` or
    /// `EMPTY` clear every finer-grained bit after them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ReaderStateFlags: u32 {
        /// This reader should be ignored
        const IGNORE = 0x0001;

        /// The state known by the resource manager differs from the one believed by the application
        const CHANGED = 0x0002;

        /// The given reader name is not recognized by the resource manager
        const UNKNOWN = 0x0004;

        /// The actual state of this reader is not available
        const UNAVAILABLE = 0x0008;

        /// There is no card in the reader
        const EMPTY = 0x0010;

        /// There is a card in the reader
        const PRESENT = 0x0020;

        /// There is a card in the reader with an ATR matching one of the target cards
        const ATRMATCH = 0x0040;

        /// The card in the reader is allocated for exclusive use by another application
        const EXCLUSIVE = 0x0080;

        /// The card is in use by other applications, but may be connected to in shared mode
        const INUSE = 0x0100;

        /// There is an unresponsive card in the reader
        const MUTE = 0x0200;

        /// The card in the reader has not been powered up
        const UNPOWERED = 0x0400;
    }
}

impl ReaderStateFlags {
    /// The application is unaware of the current state and would like to know
    ///
    /// Results in an immediate return from status-change monitoring.
    pub const UNAWARE: Self = Self::empty();

    const FINE_GRAINED: Self = Self::PRESENT
        .union(Self::ATRMATCH)
        .union(Self::EXCLUSIVE)
        .union(Self::INUSE)
        .union(Self::MUTE)
        .union(Self::UNPOWERED);

    /// Check the implications the resource manager promises between bits
    pub fn is_consistent(self) -> bool {
        if self.contains(Self::UNKNOWN) && !self.contains(Self::CHANGED | Self::IGNORE) {
            return false;
        }

        if self.contains(Self::UNAVAILABLE) && self.intersects(Self::EMPTY | Self::FINE_GRAINED) {
            return false;
        }

        if self.contains(Self::EMPTY) && self.intersects(Self::FINE_GRAINED) {
            return false;
        }

        true
    }
}

/// One entry of a status-change query
///
/// Produced fresh for every call; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderState {
    /// Reader name
    pub reader: ReaderName,

    /// State of the reader as believed by the application
    pub current_state: ReaderStateFlags,

    /// State of the reader as known by the resource manager
    pub event_state: ReaderStateFlags,

    /// ATR of the inserted card, if any
    atr: Option<Vec<u8>>,
}

impl ReaderState {
    /// Create a query entry for `reader` that asks for the current state
    pub fn new(reader: ReaderName) -> Self {
        Self {
            reader,
            current_state: ReaderStateFlags::UNAWARE,
            event_state: ReaderStateFlags::UNAWARE,
            atr: None,
        }
    }

    pub fn with_current_state(mut self, state: ReaderStateFlags) -> Self {
        self.current_state = state;
        self
    }

    pub fn atr(&self) -> Option<&[u8]> {
        self.atr.as_deref()
    }

    /// Store an ATR, truncated to [`MAX_ATR_SIZE`]; an empty ATR clears it
    pub fn set_atr(&mut self, atr: &[u8]) {
        self.atr = if atr.is_empty() {
            None
        } else {
            Some(atr[..atr.len().min(MAX_ATR_SIZE)].to_vec())
        };
    }

    /// Adopt the resource manager's view as the application's view
    pub fn sync_current_state(&mut self) {
        self.current_state = self.event_state - ReaderStateFlags::CHANGED;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reader_state_new_is_unaware() {
        let state = ReaderState::new(ReaderName::from("Reader"));
        assert_eq!(state.current_state, ReaderStateFlags::UNAWARE);
        assert!(state.atr().is_none());
    }

    #[test]
    fn test_atr_capped() {
        let mut state = ReaderState::new(ReaderName::from("Reader"));
        state.set_atr(&[0x3B; 40]);
        assert_eq!(state.atr().map(<[u8]>::len), Some(MAX_ATR_SIZE));

        state.set_atr(&[]);
        assert!(state.atr().is_none());
    }

    #[test]
    fn test_sync_current_state() {
        let mut state = ReaderState::new(ReaderName::from("Reader"));
        state.event_state = ReaderStateFlags::CHANGED | ReaderStateFlags::PRESENT;
        state.sync_current_state();
        assert_eq!(state.current_state, ReaderStateFlags::PRESENT);
    }

    #[test]
    fn test_unknown_implies_changed_and_ignore() {
        let resource_manager_view =
            ReaderStateFlags::UNKNOWN | ReaderStateFlags::CHANGED | ReaderStateFlags::IGNORE;
        assert!(resource_manager_view.is_consistent());
        assert!(!ReaderStateFlags::UNKNOWN.is_consistent());
    }

    #[test]
    fn test_empty_clears_finer_bits() {
        assert!(ReaderStateFlags::EMPTY.is_consistent());
        assert!(!(ReaderStateFlags::EMPTY | ReaderStateFlags::PRESENT).is_consistent());
        assert!(!(ReaderStateFlags::UNAVAILABLE | ReaderStateFlags::MUTE).is_consistent());
        assert!((ReaderStateFlags::PRESENT | ReaderStateFlags::INUSE).is_consistent());
    }
}
