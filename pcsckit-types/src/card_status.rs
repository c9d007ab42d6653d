//! Card status structures

use std::fmt;

use crate::{CardState, Protocol, ReaderName};

/// Status of a connected card as reported by `SCardStatus`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardStatus {
    /// Reader the card is in
    pub reader: ReaderName,

    /// Current state of the reader
    pub state: CardState,

    /// Protocol currently in use
    pub protocol: Protocol,

    /// ATR of the inserted card
    pub atr: Vec<u8>,
}

impl CardStatus {
    pub fn new(reader: ReaderName, state: CardState, protocol: Protocol, atr: Vec<u8>) -> Self {
        Self {
            reader,
            state,
            protocol,
            atr,
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Card[{}, {}, ATR: {}]",
            self.reader,
            self.protocol,
            hex::encode_upper(&self.atr)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_status_display() {
        let status = CardStatus::new(
            ReaderName::from("Reader 0"),
            CardState::PRESENT | CardState::SPECIFIC,
            Protocol::T1,
            vec![0x3B, 0x8F, 0x80],
        );
        assert_eq!(status.to_string(), "Card[Reader 0, T=1, ATR: 3B8F80]");
    }
}
