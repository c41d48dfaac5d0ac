use std::time::Duration;

/// Change-notification long-poll endpoint
pub(crate) const NOTIFICATIONS_V2_PATH: &str = "/notifications/v2";

/// No-cache configuration fetch endpoint prefix
pub(crate) const NO_CACHE_CONFIGS_PATH: &str = "/configs";

/// Notification id meaning "never seen anything from the server"
pub const INITIAL_NOTIFICATION_ID: i64 = -1;

/// The server holds a long-poll request open for up to this long.
pub const SERVER_LONG_POLL_HOLD_MS: u64 = 60_000;

pub(crate) const USER_AGENT: &str = concat!("apollo-client-rs/", env!("CARGO_PKG_VERSION"));

pub(crate) const DEFAULT_HTTP_PORT: u16 = 80;

// Applied to one-off transports that are not configured explicitly
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
pub(crate) const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(30_000);
pub(crate) const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(30_000);
