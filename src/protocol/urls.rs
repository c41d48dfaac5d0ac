use percent_encoding::utf8_percent_encode;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;

use super::encode_notifications;
use super::Notification;
use crate::constants::INITIAL_NOTIFICATION_ID;
use crate::constants::NOTIFICATIONS_V2_PATH;
use crate::constants::NO_CACHE_CONFIGS_PATH;
use crate::ProtocolError;

/// Everything except RFC 3986 unreserved characters gets percent-encoded.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

pub(crate) fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

/// Appends `path` and an encoded query string to a base URL.
///
/// The base is expected to carry no trailing slash; construction-time
/// validation rejects one.
#[derive(Debug)]
pub(crate) struct UrlBuilder {
    url: String,
    has_query: bool,
}

impl UrlBuilder {
    pub(crate) fn new(
        base: &str,
        path: &str,
    ) -> Self {
        Self {
            url: format!("{base}{path}"),
            has_query: false,
        }
    }

    pub(crate) fn param(
        mut self,
        name: &str,
        value: &str,
    ) -> Self {
        self.url.push(if self.has_query { '&' } else { '?' });
        self.url.push_str(name);
        self.url.push('=');
        self.url.push_str(&encode_component(value));
        self.has_query = true;
        self
    }

    pub(crate) fn build(self) -> String {
        self.url
    }
}

/// `GET {base}/notifications/v2?appId=&cluster=&notifications=[&label=]`
pub fn notifications_url(
    base: &str,
    app_id: &str,
    cluster: &str,
    label: &str,
    notifications: &[Notification],
) -> std::result::Result<String, ProtocolError> {
    let notifications = encode_notifications(notifications)?;

    let mut builder = UrlBuilder::new(base, NOTIFICATIONS_V2_PATH)
        .param("appId", app_id)
        .param("cluster", cluster)
        .param("notifications", &notifications);
    if !label.is_empty() {
        builder = builder.param("label", label);
    }
    Ok(builder.build())
}

/// `GET {base}/configs/{appId}/{cluster}/{namespace}[?label=][&releaseKey=][&messages=]`
///
/// `releaseKey` is only sent once a release is known, and `messages` only
/// when both the release key and a real notification id are known.
pub fn configs_url(
    base: &str,
    app_id: &str,
    cluster: &str,
    namespace: &str,
    label: &str,
    release_key: &str,
    notification_id: i64,
) -> String {
    let path = format!(
        "{}/{}/{}/{}",
        NO_CACHE_CONFIGS_PATH,
        encode_component(app_id),
        encode_component(cluster),
        encode_component(namespace)
    );

    let mut builder = UrlBuilder::new(base, &path);
    if !label.is_empty() {
        builder = builder.param("label", label);
    }
    if release_key.is_empty() {
        return builder.build();
    }
    builder = builder.param("releaseKey", release_key);

    if notification_id == INITIAL_NOTIFICATION_ID {
        return builder.build();
    }
    let messages = configs_messages(app_id, cluster, namespace, notification_id);
    builder.param("messages", &messages).build()
}

/// `{"details":{"{appId}+{cluster}+{namespace}":{notificationId}}}`
pub fn configs_messages(
    app_id: &str,
    cluster: &str,
    namespace: &str,
    notification_id: i64,
) -> String {
    let mut details = Map::new();
    details.insert(format!("{app_id}+{cluster}+{namespace}"), Value::from(notification_id));
    json!({ "details": details }).to_string()
}
