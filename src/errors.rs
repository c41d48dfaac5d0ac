//! Apollo Client Error Hierarchy
//!
//! Errors are split by the layer that produced them: construction-time
//! validation, the HTTP transport, and wire payload decoding. During the
//! initial load every variant is fatal; during steady-state polling the
//! engine logs and swallows them.

use std::fmt;
use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed URL or bad construction parameters
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Only unencrypted `http` is supported
    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// Network-layer failures (resolve, connect, timeouts, I/O)
    #[error(transparent)]
    Transport(TransportError),

    /// Wire payload decoding failures
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Server answered with a status the caller cannot interpret
    #[error("Unexpected HTTP status {status} from {url}")]
    ServerError { status: u16, url: String },

    /// Settings file or environment parsing failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures, e.g. the background runtime could not start
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Request phase a timeout was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolve,
    Connect,
    Write,
    Read,
    /// Total per-request wall-clock bound
    Watchdog,
}

impl fmt::Display for Phase {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            Phase::Resolve => "resolve",
            Phase::Connect => "connect",
            Phase::Write => "write",
            Phase::Read => "read",
            Phase::Watchdog => "watchdog",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// DNS resolution or TCP connect failed
    #[error("Host unreachable: {host}")]
    HostUnreachable {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{phase} timed out after {after:?}")]
    Timeout { phase: Phase, after: Duration },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Response head or body could not be parsed as HTTP/1.x
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Failed to decode payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<url::ParseError> for TransportError {
    fn from(e: url::ParseError) -> Self {
        TransportError::InvalidArgument(e.to_string())
    }
}

impl From<TransportError> for Error {
    // Argument errors raised by the transport keep their construction-time class.
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::InvalidArgument(msg) => Error::InvalidArgument(msg),
            TransportError::UnsupportedProtocol(scheme) => Error::UnsupportedProtocol(scheme),
            other => Error::Transport(other),
        }
    }
}
