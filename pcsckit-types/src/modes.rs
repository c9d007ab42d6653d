//! Connection mode selectors

/// Scope of a resource manager context
///
/// pcsc-lite only honours `System`; Winscard accepts any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    User,
    Terminal,
    #[default]
    System,
}

impl Scope {
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::User => 0x0000,
            Self::Terminal => 0x0001,
            Self::System => 0x0002,
        }
    }
}

/// Sharing mode for card connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShareMode {
    /// Exclusive access to the card
    Exclusive,

    /// Shared access to the card (default)
    #[default]
    Shared,

    /// Direct control of the reader, even without a card in it
    Direct,
}

impl ShareMode {
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::Exclusive => 0x0001,
            Self::Shared => 0x0002,
            Self::Direct => 0x0003,
        }
    }
}

/// Action taken on the card at disconnect or end of transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Disposition {
    /// Do not do anything special
    #[default]
    Leave,

    /// Reset the card
    Reset,

    /// Power down the card
    Unpower,

    /// Eject the card
    Eject,
}

impl Disposition {
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::Leave => 0x0000,
            Self::Reset => 0x0001,
            Self::Unpower => 0x0002,
            Self::Eject => 0x0003,
        }
    }
}

/// Card initialization performed on reconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Initialization {
    /// Do not do anything special on reconnect
    #[default]
    Leave,

    /// Reset the card (warm reset)
    Reset,

    /// Power down the card and reset it (cold reset)
    Unpower,
}

impl Initialization {
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::Leave => 0x0000,
            Self::Reset => 0x0001,
            Self::Unpower => 0x0002,
        }
    }
}
