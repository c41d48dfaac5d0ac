use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// What to subscribe to and how often to poll
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Grayscale release label; empty means none
    #[serde(default)]
    pub label: String,

    /// Pause between two notification polls. `<= 0` never polls.
    #[serde(default = "default_long_poller_interval_ms")]
    pub long_poller_interval_ms: i64,

    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cluster_name: default_cluster_name(),
            label: String::new(),
            long_poller_interval_ms: default_long_poller_interval_ms(),
            namespaces: default_namespaces(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cluster_name.is_empty() {
            return Err(Error::InvalidArgument("cluster_name must not be empty".into()));
        }
        if self.namespaces.is_empty() {
            return Err(Error::InvalidArgument("at least one namespace is required".into()));
        }
        if self.namespaces.iter().any(String::is_empty) {
            return Err(Error::InvalidArgument("namespace names must not be empty".into()));
        }
        Ok(())
    }
}

fn default_cluster_name() -> String {
    "default".to_string()
}
fn default_long_poller_interval_ms() -> i64 {
    1000
}
fn default_namespaces() -> Vec<String> {
    vec!["application".to_string()]
}
