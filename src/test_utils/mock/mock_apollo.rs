//! In-process configuration server speaking the long-polling protocol.
//!
//! Notification polls answer `304` immediately when nothing changed instead
//! of holding the request, so poll cycles stay short in tests.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use super::MockServer;
use super::RecordedRequest;
use super::Reply;
use crate::constants::NOTIFICATIONS_V2_PATH;
use crate::constants::NO_CACHE_CONFIGS_PATH;
use crate::decode_notifications;
use crate::encode_notifications;
use crate::ConfigMap;
use crate::Notification;

#[derive(Debug, Clone)]
struct Release {
    release_key: String,
    configs: ConfigMap,
    notification_id: i64,
}

#[derive(Debug, Default)]
struct ApolloState {
    releases: BTreeMap<String, Release>,
    failing: BTreeSet<String>,
    notifications_reply: Option<Reply>,
}

pub(crate) struct MockApollo {
    server: MockServer,
    state: Arc<Mutex<ApolloState>>,
}

impl MockApollo {
    pub(crate) fn start() -> Self {
        let state = Arc::new(Mutex::new(ApolloState::default()));
        let handler_state = state.clone();
        let server = MockServer::start(move |request| handle(&handler_state, request));
        Self { server, state }
    }

    /// Registers (or replaces) a namespace release with notification id 1.
    pub(crate) fn with_namespace(
        self,
        namespace: &str,
        release_key: &str,
        configs: ConfigMap,
    ) -> Self {
        self.state.lock().releases.insert(
            namespace.to_string(),
            Release {
                release_key: release_key.to_string(),
                configs,
                notification_id: 1,
            },
        );
        self
    }

    /// Publishes a new release and bumps the namespace's notification id.
    pub(crate) fn publish(
        &self,
        namespace: &str,
        release_key: &str,
        configs: ConfigMap,
    ) {
        let mut state = self.state.lock();
        let next_id = state
            .releases
            .get(namespace)
            .map(|r| r.notification_id + 1)
            .unwrap_or(1);
        state.releases.insert(
            namespace.to_string(),
            Release {
                release_key: release_key.to_string(),
                configs,
                notification_id: next_id,
            },
        );
    }

    pub(crate) fn notification_id(
        &self,
        namespace: &str,
    ) -> Option<i64> {
        self.state.lock().releases.get(namespace).map(|r| r.notification_id)
    }

    /// Makes configuration fetches of `namespace` answer `500`.
    pub(crate) fn fail_configs(
        &self,
        namespace: &str,
        failing: bool,
    ) {
        let mut state = self.state.lock();
        if failing {
            state.failing.insert(namespace.to_string());
        } else {
            state.failing.remove(namespace);
        }
    }

    /// Fixed reply for notification polls; `None` restores the protocol.
    pub(crate) fn set_notifications_reply(
        &self,
        reply: Option<Reply>,
    ) {
        self.state.lock().notifications_reply = reply;
    }

    pub(crate) fn url(&self) -> String {
        self.server.url()
    }

    pub(crate) fn notification_polls(&self) -> usize {
        self.server.count(NOTIFICATIONS_V2_PATH)
    }

    pub(crate) fn config_fetches(&self) -> usize {
        self.server.count(NO_CACHE_CONFIGS_PATH)
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.server.requests()
    }
}

fn handle(
    state: &Mutex<ApolloState>,
    request: &RecordedRequest,
) -> Reply {
    let path = request.path().to_string();
    if path == NOTIFICATIONS_V2_PATH {
        return notifications(state, request);
    }
    if let Some(rest) = path.strip_prefix(NO_CACHE_CONFIGS_PATH) {
        return configs(state, request, rest);
    }
    Reply::status(404)
}

fn notifications(
    state: &Mutex<ApolloState>,
    request: &RecordedRequest,
) -> Reply {
    let state = state.lock();
    if let Some(reply) = &state.notifications_reply {
        return reply.clone();
    }

    let Some(known) = request
        .query_param("notifications")
        .and_then(|raw| decode_notifications(raw.as_bytes()).ok())
    else {
        return Reply::status(400);
    };

    let changed: Vec<Notification> = known
        .iter()
        .filter_map(|n| {
            let release = state.releases.get(&n.namespace_name)?;
            (release.notification_id != n.notification_id)
                .then(|| Notification::new(n.namespace_name.clone(), release.notification_id))
        })
        .collect();

    if changed.is_empty() {
        return Reply::status(304);
    }
    match encode_notifications(&changed) {
        Ok(body) => Reply::ok(body),
        Err(_) => Reply::status(500),
    }
}

fn configs(
    state: &Mutex<ApolloState>,
    request: &RecordedRequest,
    rest: &str,
) -> Reply {
    // `/{appId}/{cluster}/{namespace}`
    let segments: Vec<String> = rest
        .trim_start_matches('/')
        .split('/')
        .map(|s| {
            percent_encoding::percent_decode_str(s)
                .decode_utf8_lossy()
                .into_owned()
        })
        .collect();
    let [app_id, cluster, namespace] = segments.as_slice() else {
        return Reply::status(404);
    };

    let state = state.lock();
    if state.failing.contains(namespace) {
        return Reply::status(500);
    }
    let Some(release) = state.releases.get(namespace) else {
        return Reply::status(404);
    };
    if request.query_param("releaseKey").as_deref() == Some(release.release_key.as_str()) {
        return Reply::status(304);
    }

    let body = json!({
        "appId": app_id,
        "cluster": cluster,
        "namespaceName": namespace,
        "configurations": release.configs,
        "releaseKey": release.release_key,
    });
    Reply::ok(body.to_string())
}
