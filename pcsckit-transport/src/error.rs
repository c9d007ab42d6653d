//! Transport errors
//!
//! The transport speaks only in PC/SC result codes.

use pcsckit_core::ScardError;

pub type Result<T> = std::result::Result<T, ScardError>;
