//! # pcsckit
//!
//! Async smart-card reader sessions over PC/SC Lite.
//!
//! ## Features
//!
//! - Reader enumeration with per-model peripheral drivers
//! - Time-bounded, cancellable card polling
//! - Typed card families adopted from raw connections
//! - Every resource manager call serialised on one worker thread
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use pcsckit::{DriverKind, GenericCard, Picc, Session, TransceiveMode};
//! use pcsckit::drivers::Acr122Driver;
//!
//! #[tokio::main]
//! async fn main() -> pcsckit::Result<()> {
//!     let session = Session::open().await?;
//!
//!     // Only ACR122 readers
//!     let readers = session
//!         .list_readers(&[], &[DriverKind::of::<Acr122Driver>()])
//!         .await?;
//!
//!     if let Some(reader) = readers.first() {
//!         if let Some(card) = reader.poll::<GenericCard>(Duration::from_secs(5)).await? {
//!             // GET DATA (UID)
//!             let uid = card.transmit(&[0xFF, 0xCA, 0x00, 0x00, 0x00], TransceiveMode::Raw).await?;
//!             println!("{:02X?}", uid);
//!         }
//!     }
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod picc;
mod poll;
pub mod reader;
pub mod session;
pub mod transceive;
pub mod unit;

#[cfg(test)]
mod testing;

// Re-exports
pub use cancel::CancelToken;
pub use config::SessionConfig;
pub use driver::{DriverKind, DriverType, PassthroughDriver, PeripheralDriver};
pub use error::{DriverError, ReaderError, Result};
pub use picc::{GenericCard, Picc};
pub use reader::CardReader;
pub use session::Session;
pub use transceive::TransceiveMode;
pub use unit::Unit;

// Re-export lower layers
pub use pcsckit_core::{AtrPattern, Code, Command, Response, ScardError, StatusWord};
pub use pcsckit_transport::Transport;
pub use pcsckit_types::{
    Attribute, CardState, CardStatus, Disposition, Initialization, Protocol, Protocols,
    ReaderGroup, ReaderName, ReaderStateFlags, Scope, ShareMode,
};
