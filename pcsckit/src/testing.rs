//! Shared fixtures for unit tests

use std::sync::Arc;
use std::time::{Duration, Instant};

use pcsckit_transport::MockTransport;
use pcsckit_types::{CardState, CardStatus, ContextHandle, Protocol, ReaderName};

use crate::config::SessionConfig;
use crate::session::Session;

pub const READER: &str = "ACS ACR122U PICC Interface";

/// MIFARE Classic 1K as reported by an ACR122U
pub const ATR: &[u8] = &[
    0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C, 0xA0, 0x00, 0x00, 0x03, 0x06, 0x03, 0x00, 0x01,
    0x00, 0x00, 0x00, 0x00, 0x6A,
];

pub const QUANTUM: Duration = Duration::from_millis(2);

pub fn config() -> SessionConfig {
    SessionConfig::new().with_poll_quantum(QUANTUM)
}

pub fn expect_context(mock: &mut MockTransport) {
    mock.expect_establish_context()
        .returning(|_| Ok(ContextHandle(1)));
    mock.expect_release_context().returning(|_| Ok(()));
}

pub fn expect_status(mock: &mut MockTransport) {
    mock.expect_status().returning(|_| {
        Ok(CardStatus::new(
            ReaderName::from(READER),
            CardState::PRESENT | CardState::POWERED | CardState::SPECIFIC,
            Protocol::T1,
            ATR.to_vec(),
        ))
    });
}

pub async fn session(mock: MockTransport) -> Session {
    Session::open_with(Arc::new(mock), config())
        .await
        .expect("mock session should open")
}

/// Poll `condition` until it holds or a second has passed
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    condition()
}
