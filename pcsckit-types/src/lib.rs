//! Type definitions for pcsckit
//!
//! Plain value types shared by every layer: reader identifiers, protocol
//! and mode selectors, state bit-sets and the opaque handles handed out by
//! the resource manager.

pub mod attribute;
pub mod card_status;
pub mod error;
pub mod handle;
pub mod modes;
pub mod protocol;
pub mod reader;
pub mod state;

pub use attribute::Attribute;
pub use card_status::CardStatus;
pub use error::{Error, Result};
pub use handle::{CardHandle, ContextHandle};
pub use modes::{Disposition, Initialization, Scope, ShareMode};
pub use protocol::{Protocol, Protocols};
pub use reader::{ReaderGroup, ReaderName};
pub use state::{CardState, ReaderState, ReaderStateFlags};

/// Maximum amount of bytes in an ATR
pub const MAX_ATR_SIZE: usize = 33;
