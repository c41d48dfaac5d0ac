use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::Error;
use crate::Result;

/// Location of the configuration service
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Base URL, e.g. `http://localhost:8080`; plain `http` without a
    /// trailing slash
    #[serde(default = "default_url")]
    pub url: String,

    /// Application whose namespaces are loaded
    #[serde(default)]
    pub app_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            app_id: String::new(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        validate_base_url(&self.url)?;
        if self.app_id.is_empty() {
            return Err(Error::InvalidArgument("app_id must not be empty".into()));
        }
        Ok(())
    }
}

pub(crate) fn validate_base_url(base: &str) -> Result<()> {
    let url = Url::parse(base).map_err(|e| Error::InvalidArgument(format!("invalid server url {base:?}: {e}")))?;
    if url.scheme() != "http" {
        return Err(Error::UnsupportedProtocol(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::InvalidArgument(format!("server url {base:?} has no host")));
    }
    if base.ends_with('/') {
        return Err(Error::InvalidArgument(format!(
            "server url {base:?} must not end with '/'"
        )));
    }
    Ok(())
}

fn default_url() -> String {
    "http://localhost:8080".to_string()
}
