//! Long-polling engine.
//!
//! - [`ApolloClient`] - loads namespaces, runs the poll thread, serves reads
//! - [`ClientBuilder`] - programmatic construction
//! - [`NotificationCallback`] - change listener, held weakly
//!
//! # Basic Usage
//! ```no_run
//! use std::sync::Arc;
//!
//! use apollo_client::notification_listener;
//! use apollo_client::ApolloClient;
//!
//! let client = ApolloClient::builder("http://localhost:8080", "checkout")
//!     .namespaces(["application", "db"])
//!     .build()
//!     .unwrap();
//!
//! let listener = notification_listener(|namespace, _old, _new, changes| {
//!     for change in &changes {
//!         println!("{namespace}: {:?} {}={}", change.kind, change.key, change.value);
//!     }
//! });
//! client.set_notifications_listener(Arc::downgrade(&listener));
//!
//! client.start(1000);
//! println!("{:?}", client.get_configures("application"));
//! client.stop();
//! ```

mod builder;
mod listener;
mod poller;

pub use builder::*;
pub use listener::*;


use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::configs_url;
use crate::network::block_on;
use crate::notifications_url;
use crate::ApolloConfig;
use crate::ConfigMap;
use crate::Error;
use crate::HttpClient;
use crate::NamespaceState;
use crate::Notification;
use crate::ProtocolError;
use crate::Result;

thread_local! {
    /// Identity of the engine whose poll loop runs on this thread, 0 if none
    static POLLING_FOR: Cell<usize> = const { Cell::new(0) };
}

/// State shared between the caller-facing handle and the poll thread
pub(crate) struct ClientInner {
    config: ApolloConfig,
    http: HttpClient,
    namespaces: BTreeMap<String, NamespaceState>,
    listener: Listener,
    running: AtomicBool,
    #[cfg(test)]
    fail_next_poll: AtomicBool,
}

impl ClientInner {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Notification poll URL carrying every namespace's last seen id.
    fn poll_url(&self) -> std::result::Result<String, ProtocolError> {
        let notifications: Vec<Notification> = self
            .namespaces
            .iter()
            .map(|(namespace, state)| Notification::new(namespace.as_str(), state.notification_id()))
            .collect();
        notifications_url(
            &self.config.server.url,
            &self.config.server.app_id,
            &self.config.client.cluster_name,
            &self.config.client.label,
            &notifications,
        )
    }

    fn config_url(
        &self,
        namespace: &str,
        release_key: &str,
        notification_id: i64,
    ) -> String {
        configs_url(
            &self.config.server.url,
            &self.config.server.app_id,
            &self.config.client.cluster_name,
            namespace,
            &self.config.client.label,
            release_key,
            notification_id,
        )
    }

    fn identity(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }
}

struct Worker {
    handle: JoinHandle<()>,
    token: CancellationToken,
}

/// Leaves the engine stopped when the poll thread exits, panics included.
struct RunningGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("long-poll thread exited abnormally, engine stopped");
        }
        self.flag.store(false, Ordering::Release);
    }
}

/// Client for one application on one configuration server.
///
/// Construction validates the settings and loads every namespace
/// synchronously; a returned client always has its initial values.
/// Starting it spawns exactly one background thread that long-polls for
/// changes, reconciles the cache and calls the listener.
pub struct ApolloClient {
    inner: Arc<ClientInner>,
    /// Serializes start/stop. The poll thread never takes this lock.
    worker: Mutex<Option<Worker>>,
}

impl ApolloClient {
    pub fn builder(
        url: impl Into<String>,
        app_id: impl Into<String>,
    ) -> ClientBuilder {
        ClientBuilder::new(url, app_id)
    }

    /// Validates `config`, then performs the initial load.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] / [`Error::UnsupportedProtocol`] for bad settings
    /// - [`Error::Transport`], [`Error::Protocol`] or [`Error::ServerError`] when
    ///   any namespace cannot be loaded
    pub fn from_config(config: ApolloConfig) -> Result<Self> {
        let config = config.validate()?;

        let namespaces = config
            .client
            .namespaces
            .iter()
            .map(|namespace| (namespace.clone(), NamespaceState::default()))
            .collect();
        let inner = Arc::new(ClientInner {
            http: HttpClient::new(config.network.timeouts()),
            config,
            namespaces,
            listener: Listener::default(),
            running: AtomicBool::new(false),
            #[cfg(test)]
            fail_next_poll: AtomicBool::new(false),
        });

        block_on(poller::initial_load(&inner))
            .map_err(|e| Error::Fatal(format!("cannot run initial load: {e}")))??;
        info!(
            app_id = %inner.config.server.app_id,
            cluster = %inner.config.client.cluster_name,
            namespaces = inner.namespaces.len(),
            "configuration loaded"
        );

        Ok(Self {
            inner,
            worker: Mutex::new(None),
        })
    }

    /// Starts long polling every `interval_ms`.
    ///
    /// A no-op when `interval_ms <= 0`, when already running, or when called
    /// from the listener.
    pub fn start(
        &self,
        interval_ms: i64,
    ) {
        if interval_ms <= 0 {
            debug!(interval_ms, "no poll interval, not starting");
            return;
        }
        if self.on_poll_thread() {
            warn!("start() from the notification listener is ignored");
            return;
        }

        let mut slot = self.worker.lock();
        if self.inner.is_running() {
            return;
        }
        // Left behind when the listener stopped the engine from its own thread
        if let Some(stale) = slot.take() {
            stale.token.cancel();
            join(stale);
        }
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        match self.spawn_worker(Duration::from_millis(interval_ms.unsigned_abs())) {
            Ok(worker) => *slot = Some(worker),
            Err(e) => {
                error!("failed to start long polling: {:?}", e);
                self.inner.running.store(false, Ordering::Release);
            }
        }
    }

    /// Starts with the configured `long_poller_interval_ms`.
    pub fn start_long_polling(&self) {
        self.start(self.inner.config.client.long_poller_interval_ms);
    }

    /// Stops polling and waits for the poll thread to exit.
    ///
    /// Safe to call repeatedly. From inside the listener it only flags the
    /// loop to finish, since the thread cannot join itself.
    pub fn stop(&self) {
        if self.on_poll_thread() {
            if self.inner.running.swap(false, Ordering::AcqRel) {
                info!("long polling stop requested from listener");
            }
            return;
        }

        let mut slot = self.worker.lock();
        self.inner.running.store(false, Ordering::Release);
        if let Some(worker) = slot.take() {
            worker.token.cancel();
            join(worker);
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Snapshot copy of a namespace's values; empty for unknown namespaces.
    pub fn get_configures(
        &self,
        namespace: &str,
    ) -> ConfigMap {
        self.inner
            .namespaces
            .get(namespace)
            .map(NamespaceState::configs)
            .unwrap_or_default()
    }

    /// Replaces the listener. Calls already in flight keep the one they
    /// started with.
    pub fn set_notifications_listener(
        &self,
        callback: Weak<NotificationCallback>,
    ) {
        self.inner.listener.set(callback);
    }

    /// Subscribed namespaces in poll order
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.inner.namespaces.keys().map(String::as_str)
    }

    pub fn config(&self) -> &ApolloConfig {
        &self.inner.config
    }

    fn on_poll_thread(&self) -> bool {
        let me = self.inner.identity();
        POLLING_FOR.with(|current| current.get() == me)
    }

    fn spawn_worker(
        &self,
        interval: Duration,
    ) -> std::io::Result<Worker> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let token = CancellationToken::new();

        let inner = self.inner.clone();
        let loop_token = token.clone();
        let handle = std::thread::Builder::new()
            .name("apollo-long-poll".to_string())
            .spawn(move || {
                POLLING_FOR.with(|current| current.set(inner.identity()));
                let _running = RunningGuard { flag: &inner.running };
                runtime.block_on(poller::poll_loop(&inner, interval, loop_token));
            })?;

        Ok(Worker { handle, token })
    }
}

fn join(worker: Worker) {
    if worker.handle.join().is_err() {
        error!("long-poll thread panicked");
    }
}

impl Drop for ApolloClient {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ApolloClient {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ApolloClient")
            .field("app_id", &self.inner.config.server.app_id)
            .field("namespaces", &self.inner.namespaces.keys().collect::<Vec<_>>())
            .field("running", &self.is_running())
            .finish()
    }
}
