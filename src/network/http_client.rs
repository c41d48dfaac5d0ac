use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tracing::debug;

use super::session;
use super::session::PreparedRequest;
use super::HttpHeaders;
use super::HttpRequest;
use super::HttpResponse;
use super::Timeouts;
use crate::TransportError;

pub type HttpResult = std::result::Result<HttpResponse, TransportError>;

/// HTTP client with independently configurable connect, write and read
/// timeouts plus a whole-request watchdog.
///
/// Timeouts are captured when a call starts, so a setter affects the next
/// call only. Cloning is cheap and clones share the timeout settings.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    timeouts: Arc<RwLock<Timeouts>>,
}

impl HttpClient {
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            timeouts: Arc::new(RwLock::new(timeouts)),
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        *self.timeouts.read()
    }

    pub fn set_connection_timeout(
        &self,
        timeout: Option<Duration>,
    ) {
        self.timeouts.write().connect = timeout;
    }

    pub fn set_read_timeout(
        &self,
        timeout: Option<Duration>,
    ) {
        self.timeouts.write().read = timeout;
    }

    pub fn set_write_timeout(
        &self,
        timeout: Option<Duration>,
    ) {
        self.timeouts.write().write = timeout;
    }

    /// Explicit total bound; `None` falls back to the sum of phase timeouts.
    pub fn set_watchdog_timeout(
        &self,
        timeout: Option<Duration>,
    ) {
        self.timeouts.write().watchdog = timeout;
    }

    /// Runs one request/response session.
    ///
    /// This is the primitive both call shapes are built on. The engine awaits
    /// it directly from its event loop.
    pub async fn request(
        &self,
        request: HttpRequest,
    ) -> HttpResult {
        let timeouts = self.timeouts();
        let prepared = PreparedRequest::prepare(&request)?;
        debug!(method = request.method.as_str(), url = %request.url, "http request");
        session::run(prepared, timeouts).await
    }

    //-----------------------------------------------------------
    // Blocking

    /// Blocking GET.
    ///
    /// Drives the session on a private current-thread runtime. Safe to call
    /// from inside another tokio runtime: the private runtime then runs on a
    /// scoped helper thread.
    pub fn get(
        &self,
        url: &str,
        headers: &HttpHeaders,
    ) -> HttpResult {
        block_on(self.request(HttpRequest::get(url).with_headers(headers)))?
    }

    pub fn post(
        &self,
        url: &str,
        body: impl Into<Bytes>,
        content_type: &str,
        headers: &HttpHeaders,
    ) -> HttpResult {
        block_on(self.request(HttpRequest::post(url, body, content_type).with_headers(headers)))?
    }

    //-----------------------------------------------------------
    // Callback based

    /// Non-blocking GET completed through `on_done`.
    ///
    /// The session is spawned on `handle`; `on_done` runs exactly once on that
    /// runtime and never before this call has returned, so it is safe to
    /// register follow-up state after initiating the call.
    pub fn get_async<F>(
        &self,
        handle: &Handle,
        url: &str,
        headers: &HttpHeaders,
        on_done: F,
    ) where
        F: FnOnce(HttpResult) + Send + 'static,
    {
        self.spawn_request(handle, HttpRequest::get(url).with_headers(headers), on_done);
    }

    pub fn post_async<F>(
        &self,
        handle: &Handle,
        url: &str,
        body: impl Into<Bytes>,
        content_type: &str,
        headers: &HttpHeaders,
        on_done: F,
    ) where
        F: FnOnce(HttpResult) + Send + 'static,
    {
        self.spawn_request(
            handle,
            HttpRequest::post(url, body, content_type).with_headers(headers),
            on_done,
        );
    }

    fn spawn_request<F>(
        &self,
        handle: &Handle,
        request: HttpRequest,
        on_done: F,
    ) where
        F: FnOnce(HttpResult) + Send + 'static,
    {
        let client = self.clone();
        handle.spawn(async move {
            let result = client.request(request).await;
            on_done(result);
        });
    }
}

pub(crate) fn block_on<F>(future: F) -> std::result::Result<F::Output, TransportError>
where
    F: Future + Send,
    F::Output: Send,
{
    let run = move || -> std::result::Result<F::Output, TransportError> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(runtime.block_on(future))
    };

    if Handle::try_current().is_err() {
        return run();
    }
    std::thread::scope(|scope| match scope.spawn(run).join() {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    })
}
