//! Timeout-bounded HTTP/1.1 transport.
//!
//! Every request runs as one session of four phases:
//!
//! ```text
//! Resolve -> Connect    bounded together by the connect timeout
//! Write                 bounded by the write timeout
//! Read                  bounded by the read timeout
//! ```
//!
//! A watchdog bounds the whole session independently of the phase timers,
//! so the completion is delivered in bounded time even if a phase bound
//! never fires. Only unencrypted `http` is supported.
//!
//! The same session backs both call shapes of [`HttpClient`]: blocking
//! ([`HttpClient::get`], [`HttpClient::post`]) and callback based
//! ([`HttpClient::get_async`], [`HttpClient::post_async`]).

mod http_client;
mod response;
mod session;
mod timeouts;

pub use http_client::*;
pub use timeouts::*;
pub(crate) use http_client::block_on;
pub(crate) use timeouts::millis;


use std::borrow::Cow;
use std::collections::BTreeMap;

use bytes::Bytes;

/// Extra request headers, applied after (and overriding) the defaults
pub type HttpHeaders = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HttpHeaders,
    /// `(content_type, body)` for requests that carry one
    pub body: Option<(String, Bytes)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: HttpHeaders::new(),
            body: None,
        }
    }

    pub fn post(
        url: impl Into<String>,
        body: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: HttpHeaders::new(),
            body: Some((content_type.into(), body.into())),
        }
    }

    pub fn with_headers(
        mut self,
        headers: &HttpHeaders,
    ) -> Self {
        self.headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

/// Raw response, returned as-is: status interpretation is up to the caller.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Case-insensitive header lookup
    pub fn header(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
