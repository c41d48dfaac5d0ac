//! Configuration management for the Apollo client.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Section-wise validation
mod client;
mod network;
mod server;
pub use client::*;
pub use network::*;
pub use server::*;

use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

const ENV_PREFIX: &str = "APOLLO";

/// Everything needed to construct an [`ApolloClient`](crate::ApolloClient)
///
/// Combines all sections with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ApolloConfig {
    /// Where the configuration service lives and which application to load
    #[serde(default)]
    pub server: ServerConfig,
    /// Cluster, label, namespaces and polling cadence
    #[serde(default)]
    pub client: ClientConfig,
    /// Transport timeouts
    #[serde(default)]
    pub network: NetworkConfig,
}

impl ApolloConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Later sources override earlier ones:
    /// 1. Type defaults
    /// 2. Configuration file from the `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with the `APOLLO__` prefix
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("APOLLO__SERVER__URL", "http://config.local:8080");
    /// std::env::set_var("APOLLO__SERVER__APP_ID", "checkout");
    /// std::env::set_var("APOLLO__CLIENT__NAMESPACES", "application,db");
    /// let cfg = ApolloConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        let config: Self = builder.add_source(environment()).build()?.try_deserialize()?;
        Ok(config)
    }

    /// Merges a configuration file over the current values, then the
    /// environment again. Callers validate once all overrides are applied.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Consumes self and applies every construction rule.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`](crate::Error::InvalidArgument) or
    /// [`Error::UnsupportedProtocol`](crate::Error::UnsupportedProtocol) for
    /// the first rule violated.
    pub fn validate(self) -> Result<Self> {
        self.server.validate()?;
        self.client.validate()?;
        self.network.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("client.namespaces")
}
