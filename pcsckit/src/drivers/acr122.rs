//! ACS ACR122 readers
//!
//! The ACR122 fronts an NXP PN532. Direct transmits are tunnelled to the
//! PN532 `InDataExchange` command through the reader's pseudo-APDU:
//!
//! ```text
//! FF 00 00 00 Lc | D4 40 01 <payload>
//! ```
//!
//! and come back as `D5 41 <status> <payload> 90 00`.

use tracing::trace;

use crate::driver::{DriverResult, DriverType, PeripheralDriver, unwrap_response};
use crate::unit::Unit;

const DIRECT_TRANSMIT: [u8; 4] = [0xFF, 0x00, 0x00, 0x00];
const IN_DATA_EXCHANGE: [u8; 3] = [0xD4, 0x40, 0x01];
const IN_DATA_EXCHANGE_RESPONSE: [u8; 2] = [0xD5, 0x41];

/// Low six bits of the PN532 status byte carry the error code
const STATUS_ERROR_MASK: u8 = 0x3F;

/// Largest payload that still fits a short Lc
pub const MAX_PAYLOAD: usize = 0xFF - IN_DATA_EXCHANGE.len();

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Acr122Error {
    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Unexpected PN532 response: {0}")]
    UnexpectedResponse(String),

    #[error("PN532 error status 0x{0:02X}")]
    Status(u8),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Acr122Driver;

impl PeripheralDriver for Acr122Driver {
    fn wrap(&self, bytes: &[u8]) -> DriverResult<Vec<u8>> {
        if bytes.len() > MAX_PAYLOAD {
            return Err(Acr122Error::PayloadTooLarge {
                size: bytes.len(),
                max: MAX_PAYLOAD,
            }
            .into());
        }

        let lc = IN_DATA_EXCHANGE.len() + bytes.len();
        let mut frame = Vec::with_capacity(DIRECT_TRANSMIT.len() + 1 + lc);
        frame.extend_from_slice(&DIRECT_TRANSMIT);
        frame.push(lc as u8);
        frame.extend_from_slice(&IN_DATA_EXCHANGE);
        frame.extend_from_slice(bytes);
        Ok(frame)
    }

    fn unwrap(&self, bytes: &[u8]) -> DriverResult<Vec<u8>> {
        let body = unwrap_response(bytes)?;

        let Some(rest) = body.strip_prefix(&IN_DATA_EXCHANGE_RESPONSE) else {
            return Err(Acr122Error::UnexpectedResponse(hex::encode_upper(&body)).into());
        };
        let Some((&status, payload)) = rest.split_first() else {
            return Err(Acr122Error::UnexpectedResponse(hex::encode_upper(&body)).into());
        };

        if status & STATUS_ERROR_MASK != 0 {
            return Err(Acr122Error::Status(status).into());
        }

        Ok(payload.to_vec())
    }

    fn did_connect(&self, unit: &Unit) {
        trace!("ACR122 attached to {} on {}", unit.handle(), unit.reader());
    }
}

impl DriverType for Acr122Driver {
    const SEARCH_NAMES: &'static [&'static str] = &["ACR122"];
}
