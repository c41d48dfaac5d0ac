use serde::Deserialize;
use serde::Serialize;

use crate::constants::SERVER_LONG_POLL_HOLD_MS;
use crate::network::millis;
use crate::Error;
use crate::Result;
use crate::Timeouts;

/// Transport timeouts in milliseconds
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Bounds resolve and connect together
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Must exceed the server's long-poll hold of 60s
    #[serde(default = "default_request_read_timeout_ms")]
    pub request_read_timeout_ms: u64,

    #[serde(default = "default_request_write_timeout_ms")]
    pub request_write_timeout_ms: u64,

    /// Total per-request bound; defaults to the sum of the three above
    #[serde(default)]
    pub watchdog_timeout_ms: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connection_timeout_ms: default_connection_timeout_ms(),
            request_read_timeout_ms: default_request_read_timeout_ms(),
            request_write_timeout_ms: default_request_write_timeout_ms(),
            watchdog_timeout_ms: None,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.connection_timeout_ms == 0 {
            return Err(Error::InvalidArgument("connection_timeout_ms must be > 0".into()));
        }
        if self.request_write_timeout_ms == 0 {
            return Err(Error::InvalidArgument("request_write_timeout_ms must be > 0".into()));
        }
        if self.request_read_timeout_ms <= SERVER_LONG_POLL_HOLD_MS {
            return Err(Error::InvalidArgument(format!(
                "request_read_timeout_ms must be > {SERVER_LONG_POLL_HOLD_MS}, got {}",
                self.request_read_timeout_ms
            )));
        }
        if self.watchdog_timeout_ms == Some(0) {
            return Err(Error::InvalidArgument("watchdog_timeout_ms must be > 0 when set".into()));
        }
        Ok(())
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: millis(self.connection_timeout_ms),
            write: millis(self.request_write_timeout_ms),
            read: millis(self.request_read_timeout_ms),
            watchdog: self.watchdog_timeout_ms.and_then(millis),
        }
    }
}

fn default_connection_timeout_ms() -> u64 {
    500
}
fn default_request_read_timeout_ms() -> u64 {
    120_000
}
fn default_request_write_timeout_ms() -> u64 {
    3000
}
