//! Session configuration

use std::time::Duration;

use pcsckit_core::constants::{DEFAULT_POLL_QUANTUM, DEFAULT_POLL_TIMEOUT};
use pcsckit_types::{Protocols, Scope, ShareMode};
use tracing::warn;

/// Environment variable overriding the poll quantum, in milliseconds
pub const ENV_POLL_QUANTUM_MS: &str = "PCSCKIT_POLL_QUANTUM_MS";

/// Environment variable overriding the default poll timeout, in milliseconds
pub const ENV_POLL_TIMEOUT_MS: &str = "PCSCKIT_POLL_TIMEOUT_MS";

const MIN_POLL_QUANTUM: Duration = Duration::from_millis(1);

/// Settings applied to every reader and card of a session
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pcsckit::SessionConfig;
///
/// let config = SessionConfig::new()
///     .with_poll_quantum(Duration::from_millis(100))
///     .with_default_timeout(Duration::from_secs(30));
/// assert_eq!(config.poll_quantum(), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    scope: Scope,
    poll_quantum: Duration,
    default_timeout: Duration,
    share_mode: ShareMode,
    preferred_protocols: Protocols,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            scope: Scope::System,
            poll_quantum: DEFAULT_POLL_QUANTUM,
            default_timeout: DEFAULT_POLL_TIMEOUT,
            share_mode: ShareMode::Shared,
            preferred_protocols: Protocols::T0 | Protocols::T1,
        }
    }

    /// Defaults overlaid with `PCSCKIT_POLL_QUANTUM_MS` and `PCSCKIT_POLL_TIMEOUT_MS`
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Some(quantum) = env_millis(ENV_POLL_QUANTUM_MS) {
            config = config.with_poll_quantum(quantum);
        }
        if let Some(timeout) = env_millis(ENV_POLL_TIMEOUT_MS) {
            config = config.with_default_timeout(timeout);
        }

        config
    }

    /// Set the resource manager scope
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the polling sub-timeout; clamped to at least one millisecond
    pub fn with_poll_quantum(mut self, quantum: Duration) -> Self {
        self.poll_quantum = quantum.max(MIN_POLL_QUANTUM);
        self
    }

    /// Set the budget used when callers poll with the session default
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the share mode used when polling connects to a card
    pub fn with_share_mode(mut self, share_mode: ShareMode) -> Self {
        self.share_mode = share_mode;
        self
    }

    /// Set the protocols negotiated when polling connects to a card
    pub fn with_preferred_protocols(mut self, protocols: Protocols) -> Self {
        self.preferred_protocols = protocols;
        self
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn poll_quantum(&self) -> Duration {
        self.poll_quantum
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn share_mode(&self) -> ShareMode {
        self.share_mode
    }

    pub fn preferred_protocols(&self) -> Protocols {
        self.preferred_protocols
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    let value = std::env::var(key).ok()?;
    match parse_millis(&value) {
        Some(duration) => Some(duration),
        None => {
            warn!("Ignoring {}={:?}: expected a positive number of milliseconds", key, value);
            None
        }
    }
}

fn parse_millis(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}
