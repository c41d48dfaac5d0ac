//! One request/response exchange, phase by phase.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio::time::timeout_at;
use tokio::time::Instant;
use tracing::debug;
use tracing::trace;
use tracing::warn;
use url::Host;
use url::Url;

use super::response::read_response;
use super::HttpRequest;
use super::HttpResponse;
use super::Timeouts;
use crate::constants::DEFAULT_HTTP_PORT;
use crate::constants::USER_AGENT;
use crate::Phase;
use crate::TransportError;

/// A request validated and serialized, ready to be sent
#[derive(Debug)]
pub(crate) struct PreparedRequest {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) bytes: Vec<u8>,
}

impl PreparedRequest {
    pub(crate) fn prepare(request: &HttpRequest) -> std::result::Result<Self, TransportError> {
        let url = Url::parse(&request.url)?;
        if url.scheme() != "http" {
            return Err(TransportError::UnsupportedProtocol(url.scheme().to_string()));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => {
                return Err(TransportError::InvalidArgument(format!(
                    "missing host in {}",
                    request.url
                )))
            }
        };
        let port = url.port().unwrap_or(DEFAULT_HTTP_PORT);

        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let host_header = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => host.clone(),
        };

        let mut headers: Vec<(String, String)> = vec![
            ("Host".to_string(), host_header),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("Accept".to_string(), "*/*".to_string()),
            ("Connection".to_string(), "close".to_string()),
        ];
        if let Some((content_type, body)) = &request.body {
            headers.push(("Content-Type".to_string(), content_type.clone()));
            headers.push(("Content-Length".to_string(), body.len().to_string()));
        }
        for (name, value) in &request.headers {
            if has_line_break(name) || has_line_break(value) || name.is_empty() {
                return Err(TransportError::InvalidArgument(format!("invalid header: {name}")));
            }
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }

        let mut bytes = format!("{} {} HTTP/1.1\r\n", request.method.as_str(), target).into_bytes();
        for (name, value) in &headers {
            bytes.extend_from_slice(name.as_bytes());
            bytes.extend_from_slice(b": ");
            bytes.extend_from_slice(value.as_bytes());
            bytes.extend_from_slice(b"\r\n");
        }
        bytes.extend_from_slice(b"\r\n");
        if let Some((_, body)) = &request.body {
            bytes.extend_from_slice(body);
        }

        Ok(Self {
            host,
            port,
            bytes,
        })
    }
}

fn has_line_break(s: &str) -> bool {
    s.contains('\r') || s.contains('\n')
}

/// Runs the session under the watchdog.
///
/// When the watchdog fires the session future is dropped, which closes the
/// socket wherever the exchange was stuck.
pub(crate) async fn run(
    request: PreparedRequest,
    timeouts: Timeouts,
) -> std::result::Result<HttpResponse, TransportError> {
    let session = exchange(&request, &timeouts);

    let Some(bound) = timeouts.watchdog_bound() else {
        return session.await;
    };
    match timeout(bound, session).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                host = %request.host,
                port = request.port,
                "watchdog fired after {:?}, connection closed",
                bound
            );
            Err(TransportError::Timeout {
                phase: Phase::Watchdog,
                after: bound,
            })
        }
    }
}

async fn exchange(
    request: &PreparedRequest,
    timeouts: &Timeouts,
) -> std::result::Result<HttpResponse, TransportError> {
    let mut stream = connect(&request.host, request.port, timeouts.connect).await?;
    trace!(host = %request.host, port = request.port, "connected");

    bounded(Phase::Write, timeouts.write, async {
        stream.write_all(&request.bytes).await?;
        stream.flush().await?;
        Ok::<(), TransportError>(())
    })
    .await?;

    let response = bounded(Phase::Read, timeouts.read, read_response(&mut stream)).await?;

    if let Err(e) = stream.shutdown().await {
        if e.kind() != io::ErrorKind::NotConnected {
            debug!("shutdown after response: {:?}", e);
        }
    }
    Ok(response)
}

/// Resolve and connect share one deadline.
async fn connect(
    host: &str,
    port: u16,
    connect_timeout: Option<Duration>,
) -> std::result::Result<TcpStream, TransportError> {
    let deadline = connect_timeout.and_then(|d| Instant::now().checked_add(d).map(|at| (at, d)));

    let resolve = tokio::net::lookup_host((host, port));
    let addrs: Vec<SocketAddr> = match deadline {
        Some((at, after)) => timeout_at(at, resolve).await.map_err(|_| TransportError::Timeout {
            phase: Phase::Resolve,
            after,
        })?,
        None => resolve.await,
    }
    .map_err(|source| unreachable(host, source))?
    .collect();

    let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no address resolved");
    for addr in addrs {
        let attempt = TcpStream::connect(addr);
        let result = match deadline {
            Some((at, after)) => timeout_at(at, attempt).await.map_err(|_| TransportError::Timeout {
                phase: Phase::Connect,
                after,
            })?,
            None => attempt.await,
        };
        match result {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, "connect failed: {:?}", e);
                last_error = e;
            }
        }
    }
    Err(unreachable(host, last_error))
}

fn unreachable(
    host: &str,
    source: io::Error,
) -> TransportError {
    TransportError::HostUnreachable {
        host: host.to_string(),
        source,
    }
}

async fn bounded<T, F>(
    phase: Phase,
    limit: Option<Duration>,
    fut: F,
) -> std::result::Result<T, TransportError>
where
    F: Future<Output = std::result::Result<T, TransportError>>,
{
    match limit {
        Some(after) => timeout(after, fut)
            .await
            .map_err(|_| TransportError::Timeout { phase, after })?,
        None => fut.await,
    }
}
