//! Cooperative cancellation for polling loops

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag checked once at the top of every polling iteration
///
/// Cancelling never interrupts a transport call already in flight. Use
/// [`crate::Session::cancel`] to abort a long status-change wait; the
/// interrupted poll then ends the same way, with nothing found.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
