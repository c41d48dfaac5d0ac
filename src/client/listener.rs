use std::any::Any;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Weak;

use parking_lot::RwLock;
use tracing::trace;
use tracing::warn;

use crate::ChangeSet;
use crate::ConfigMap;

/// Receives `(namespace, old_configs, new_configs, changes)` for every
/// committed release.
///
/// Runs on the engine's poll thread. It may call
/// [`ApolloClient::stop`](crate::ApolloClient::stop); calling
/// [`ApolloClient::start`](crate::ApolloClient::start) from here is ignored.
pub type NotificationCallback = dyn Fn(&str, &ConfigMap, &ConfigMap, ChangeSet) + Send + Sync;

/// Wraps a closure as a [`NotificationCallback`].
///
/// The engine only keeps a [`Weak`] handle, so the caller must hold on to the
/// returned `Arc` for as long as it wants notifications.
///
/// ```ignore
/// let listener = notification_listener(|namespace, _old, _new, changes| {
///     println!("{namespace}: {} changes", changes.len());
/// });
/// client.set_notifications_listener(Arc::downgrade(&listener));
/// ```
pub fn notification_listener<F>(f: F) -> Arc<NotificationCallback>
where
    F: Fn(&str, &ConfigMap, &ConfigMap, ChangeSet) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Default)]
pub(crate) struct Listener {
    callback: RwLock<Option<Weak<NotificationCallback>>>,
}

impl Listener {
    pub(crate) fn set(
        &self,
        callback: Weak<NotificationCallback>,
    ) {
        *self.callback.write() = Some(callback);
    }

    /// Invokes the callback if it is still alive. A panic inside it is
    /// logged and swallowed.
    pub(crate) fn notify(
        &self,
        namespace: &str,
        old: &ConfigMap,
        new: &ConfigMap,
        changes: ChangeSet,
    ) {
        let callback = self.callback.read().as_ref().and_then(Weak::upgrade);
        let Some(callback) = callback else {
            trace!(namespace, "no live listener");
            return;
        };

        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(namespace, old, new, changes))) {
            warn!(namespace, "notification listener panicked: {}", panic_message(&*panic));
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
