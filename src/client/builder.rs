use std::time::Duration;

use super::ApolloClient;
use crate::ApolloConfig;
use crate::ClientConfig;
use crate::NetworkConfig;
use crate::Result;

pub struct ClientBuilder {
    config: ApolloConfig,
}

impl ClientBuilder {
    /// Create a new builder with default settings for `url` and `app_id`
    pub fn new(
        url: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Self {
        let mut config = ApolloConfig::default();
        config.server.url = url.into();
        config.server.app_id = app_id.into();
        Self { config }
    }

    /// Set cluster name (default: `default`)
    pub fn cluster(
        mut self,
        cluster: impl Into<String>,
    ) -> Self {
        self.config.client.cluster_name = cluster.into();
        self
    }

    /// Set grayscale release label (default: none)
    pub fn label(
        mut self,
        label: impl Into<String>,
    ) -> Self {
        self.config.client.label = label.into();
        self
    }

    /// Set subscribed namespaces (default: `application`)
    pub fn namespaces<I, S>(
        mut self,
        namespaces: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.client.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    /// Interval used by [`ApolloClient::start_long_polling`] (default: 1000 ms)
    pub fn long_poller_interval_ms(
        mut self,
        interval_ms: i64,
    ) -> Self {
        self.config.client.long_poller_interval_ms = interval_ms;
        self
    }

    /// Set connection timeout (default: 500 ms)
    pub fn connect_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.network.connection_timeout_ms = as_millis(timeout);
        self
    }

    /// Set read timeout (default: 120 s, must exceed 60 s)
    pub fn read_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.network.request_read_timeout_ms = as_millis(timeout);
        self
    }

    /// Set write timeout (default: 3 s)
    pub fn write_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.network.request_write_timeout_ms = as_millis(timeout);
        self
    }

    /// Set the whole-request bound (default: sum of the three phase timeouts)
    pub fn watchdog_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.network.watchdog_timeout_ms = Some(as_millis(timeout));
        self
    }

    /// Completely replaces the client section
    ///
    /// # Warning: Configuration Override
    /// This discards previous calls to [`cluster`](ClientBuilder::cluster),
    /// [`label`](ClientBuilder::label),
    /// [`namespaces`](ClientBuilder::namespaces) and
    /// [`long_poller_interval_ms`](ClientBuilder::long_poller_interval_ms).
    pub fn set_config(
        mut self,
        config: ClientConfig,
    ) -> Self {
        self.config.client = config;
        self
    }

    /// Completely replaces the timeout settings
    pub fn set_network_config(
        mut self,
        config: NetworkConfig,
    ) -> Self {
        self.config.network = config;
        self
    }

    /// Validate, then load every namespace. Blocks until loaded.
    pub fn build(self) -> Result<ApolloClient> {
        ApolloClient::from_config(self.config)
    }
}

fn as_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
