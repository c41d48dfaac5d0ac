use std::time::Duration;

use crate::constants::DEFAULT_CONNECT_TIMEOUT;
use crate::constants::DEFAULT_READ_TIMEOUT;
use crate::constants::DEFAULT_WRITE_TIMEOUT;

/// Per-call timeout settings of the transport
///
/// `None` disables a bound. The watchdog, when not set explicitly, is the sum
/// of the three phase timeouts; it is unbounded only if one of them is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Covers resolve and connect together
    pub connect: Option<Duration>,
    pub write: Option<Duration>,
    pub read: Option<Duration>,
    /// Explicit total bound for a request
    pub watchdog: Option<Duration>,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Some(DEFAULT_CONNECT_TIMEOUT),
            write: Some(DEFAULT_WRITE_TIMEOUT),
            read: Some(DEFAULT_READ_TIMEOUT),
            watchdog: None,
        }
    }
}

impl Timeouts {
    /// No bound at all, for callers that set only what they need.
    pub fn unbounded() -> Self {
        Self {
            connect: None,
            write: None,
            read: None,
            watchdog: None,
        }
    }

    /// Total wall-clock bound armed at session start.
    pub fn watchdog_bound(&self) -> Option<Duration> {
        if self.watchdog.is_some() {
            return self.watchdog;
        }
        let (connect, write, read) = (self.connect?, self.write?, self.read?);
        // Overflow means "effectively forever"
        Some(
            connect
                .checked_add(write)
                .and_then(|d| d.checked_add(read))
                .unwrap_or(Duration::MAX),
        )
    }
}

/// Milliseconds from configuration to an optional bound; 0 disables.
pub(crate) fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
