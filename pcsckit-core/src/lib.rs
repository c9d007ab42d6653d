//! # pcsckit-core
//!
//! Core primitives shared by the transport and session layers.
//!
//! This crate provides:
//! - The PC/SC result code taxonomy (`Code`, `ScardError`, `interpret`)
//! - Protocol control information for transmit calls
//! - ATR pattern matching
//! - ISO 7816-4 command/response framing consumed over transmit
//! - Buffer size and polling constants

pub mod apdu;
pub mod atr;
pub mod code;
pub mod constants;
pub mod error;
pub mod pci;
pub mod response;
pub mod scard;
pub mod status;

pub use apdu::Command;
pub use atr::AtrPattern;
pub use code::Code;
pub use error::{Error, Result};
pub use pci::Pci;
pub use response::Response;
pub use scard::{ScardError, check, interpret};
pub use status::StatusWord;
