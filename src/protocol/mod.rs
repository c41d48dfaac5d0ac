//! Wire payloads exchanged with the configuration server and the URLs that
//! request them.
//!
//! - change-notification list: `[{"namespaceName":..,"notificationId":..}]`
//! - no-cache configuration: `{"releaseKey":..,"configurations":{..}}`

mod urls;
pub use urls::*;


use serde::Deserialize;
use serde::Serialize;

use crate::ConfigMap;
use crate::ProtocolError;

/// Server-side sequence number of one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub namespace_name: String,
    pub notification_id: i64,
}

pub type Notifications = Vec<Notification>;

impl Notification {
    pub fn new(
        namespace_name: impl Into<String>,
        notification_id: i64,
    ) -> Self {
        Self {
            namespace_name: namespace_name.into(),
            notification_id,
        }
    }
}

/// Body of a successful no-cache configuration fetch
///
/// The server also sends `appId`, `cluster` and `namespaceName`; they are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPayload {
    pub release_key: String,
    pub configurations: ConfigMap,
}

pub fn encode_notifications(notifications: &[Notification]) -> std::result::Result<String, ProtocolError> {
    serde_json::to_string(notifications).map_err(Into::into)
}

pub fn decode_notifications(body: &[u8]) -> std::result::Result<Notifications, ProtocolError> {
    serde_json::from_slice(body).map_err(Into::into)
}

pub fn decode_config_payload(body: &[u8]) -> std::result::Result<ConfigPayload, ProtocolError> {
    serde_json::from_slice(body).map_err(Into::into)
}
