//! Initial load and the long-polling loop.
//!
//! Everything here runs on one task: either the construction-time runtime or
//! the engine's poll thread. Cache commits therefore never race each other.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::ClientInner;
use crate::decode_config_payload;
use crate::decode_notifications;
use crate::diff;
use crate::ConfigPayload;
use crate::Error;
use crate::HttpRequest;
use crate::NamespaceState;
use crate::Notifications;
use crate::Result;

/// Seeds notification ids (best effort) and fetches every namespace.
///
/// Any fetch failure aborts: the engine must not come up half loaded.
pub(crate) async fn initial_load(inner: &ClientInner) -> Result<()> {
    match fetch_notifications(inner).await {
        Ok(Some(notifications)) => {
            for notification in notifications {
                if let Some(state) = inner.namespaces.get(&notification.namespace_name) {
                    state.set_notification_id(notification.notification_id);
                }
            }
        }
        Ok(None) => debug!("no notification ids to seed"),
        Err(e) => warn!(error = %e, "seeding notification ids failed, continuing"),
    }

    for (namespace, state) in &inner.namespaces {
        let payload = fetch_config(inner, namespace, state).await?;
        if let Some(payload) = payload {
            debug!(
                namespace = %namespace,
                release_key = %payload.release_key,
                keys = payload.configurations.len(),
                "namespace loaded"
            );
            state.set(payload.release_key, payload.configurations);
        }
    }
    Ok(())
}

/// Polls until cancelled or the engine leaves the running state.
///
/// The first cycle runs immediately.
pub(crate) async fn poll_loop(
    inner: &ClientInner,
    interval: Duration,
    token: CancellationToken,
) {
    info!(?interval, "long polling started");
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = poll_once(inner, &token) => {}
        }
        if !keep_going(inner, &token) {
            break;
        }
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    info!("long polling stopped");
}

/// One cycle: notification poll, then a fetch per changed namespace.
///
/// Failures are logged and skipped; the caller reschedules regardless.
pub(crate) async fn poll_once(
    inner: &ClientInner,
    token: &CancellationToken,
) {
    #[cfg(test)]
    if inner.fail_next_poll.swap(false, std::sync::atomic::Ordering::AcqRel) {
        panic!("poll cycle failure");
    }

    let notifications = match fetch_notifications(inner).await {
        Ok(Some(notifications)) => notifications,
        Ok(None) => {
            warn!("notification poll: not modified");
            return;
        }
        Err(e) => {
            warn!(error = %e, "notification poll failed");
            return;
        }
    };

    for notification in notifications {
        if !keep_going(inner, token) {
            return;
        }
        let namespace = notification.namespace_name.as_str();
        let Some(state) = inner.namespaces.get(namespace) else {
            debug!(namespace, "ignoring notification for unsubscribed namespace");
            continue;
        };

        match fetch_config_for(inner, namespace, state, notification.notification_id).await {
            Ok(Some(payload)) => commit(inner, namespace, state, payload, notification.notification_id),
            Ok(None) => {
                // Release unchanged; only remember that we saw this id
                debug!(namespace, "release unchanged");
                state.set_notification_id(notification.notification_id);
            }
            Err(e) => warn!(namespace, error = %e, "config fetch failed, keeping cached state"),
        }
    }
}

fn keep_going(
    inner: &ClientInner,
    token: &CancellationToken,
) -> bool {
    inner.is_running() && !token.is_cancelled()
}

fn commit(
    inner: &ClientInner,
    namespace: &str,
    state: &NamespaceState,
    payload: ConfigPayload,
    notification_id: i64,
) {
    let old = state.configs();
    let changes = diff(&old, &payload.configurations);
    info!(
        namespace,
        release_key = %payload.release_key,
        changes = changes.len(),
        "namespace changed"
    );

    inner.listener.notify(namespace, &old, &payload.configurations, changes);

    state.set(payload.release_key, payload.configurations);
    state.set_notification_id(notification_id);
}

/// `Ok(None)` on 304.
async fn fetch_notifications(inner: &ClientInner) -> Result<Option<Notifications>> {
    let url = inner.poll_url()?;
    let response = inner.http.request(HttpRequest::get(url.as_str())).await?;
    match response.status {
        200 => Ok(Some(decode_notifications(&response.body)?)),
        304 => Ok(None),
        status => Err(Error::ServerError { status, url }),
    }
}

async fn fetch_config(
    inner: &ClientInner,
    namespace: &str,
    state: &NamespaceState,
) -> Result<Option<ConfigPayload>> {
    fetch_config_for(inner, namespace, state, state.notification_id()).await
}

/// No-cache fetch carrying the cached release key. `Ok(None)` on 304.
async fn fetch_config_for(
    inner: &ClientInner,
    namespace: &str,
    state: &NamespaceState,
    notification_id: i64,
) -> Result<Option<ConfigPayload>> {
    let url = inner.config_url(namespace, &state.release_key(), notification_id);
    let response = inner.http.request(HttpRequest::get(url.as_str())).await?;
    match response.status {
        200 => Ok(Some(decode_config_payload(&response.body)?)),
        304 => Ok(None),
        status => Err(Error::ServerError { status, url }),
    }
}
