//! Buffer and polling constants

use std::time::Duration;

pub use pcsckit_types::MAX_ATR_SIZE;

/// Largest short APDU response: 256 data bytes, status word, driver slack
pub const MAX_BUFFER_SIZE: usize = 264;

/// Largest extended APDU response
pub const MAX_BUFFER_SIZE_EXTENDED: usize = 4 + 3 + (1 << 16) + 3 + 2;

/// Largest control response accepted from a reader driver
pub const MAX_CONTROL_BUFFER_SIZE: usize = MAX_BUFFER_SIZE_EXTENDED;

/// Sub-timeout used to slice a polling budget
pub const DEFAULT_POLL_QUANTUM: Duration = Duration::from_millis(200);

/// Overall polling budget when the caller gives none
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(15);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sizes() {
        assert_eq!(MAX_BUFFER_SIZE_EXTENDED, 65548);
        assert_eq!(MAX_ATR_SIZE, 33);
    }

    #[test]
    fn test_polling_defaults() {
        assert_eq!(DEFAULT_POLL_TIMEOUT.as_millis() / DEFAULT_POLL_QUANTUM.as_millis(), 75);
    }
}
