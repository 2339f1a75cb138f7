//! Transport abstraction for the etcd client.
//!
//! This module provides a pluggable transport layer that abstracts the
//! underlying HTTP mechanism (reqwest, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and request/response oriented:
//! - `get()` performs a GET, following redirects, and returns the body
//! - `send()` performs PUT/POST/DELETE with a form-encoded body
//! - `capture_headers()` / `captured_headers()` expose the response headers
//!   of the most recent request while capture is enabled
//!
//! A non-2xx status is not a transport error: etcd reports its own errors
//! in the body (with a 4xx status), and that body must reach the decoder.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_response(r#"{"action":"get","node":{"key":"/a","value":"1"}}"#);
//! let body = transport.get("http://127.0.0.1:2379/v2/keys/a").await?;
//! ```

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::{MockRequest, MockTransport};

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport could not be initialized.
    #[error("transport init failed: {0}")]
    Init(String),

    /// The request URL is invalid.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Connection failed (refused, DNS failure, reset).
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// Redirect loop or too many redirects.
    #[error("redirect failed: {0}")]
    Redirect(String),

    /// Reading the response body failed.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Any other request failure.
    #[error("request failed: {0}")]
    RequestFailed(String),
}

impl TransportError {
    /// Stable, transport-specific code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::InvalidUrl(_) => "invalid_url",
            Self::ConnectionFailed(_) => "connect",
            Self::Timeout => "timeout",
            Self::Redirect(_) => "redirect",
            Self::Body(_) => "body",
            Self::RequestFailed(_) => "request",
        }
    }
}

/// HTTP verbs used by mutating operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Create or replace a key.
    Put,
    /// Create an in-order key under a directory.
    Post,
    /// Remove a key or directory.
    Delete,
}

impl Method {
    /// Upper-case verb name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport trait for issuing keys API requests.
///
/// Implementations block (asynchronously) until the server answers or the
/// network layer gives up. One request is in flight at a time.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url`, following redirects, and return the body.
    async fn get(&self, url: &str) -> Result<String, TransportError>;

    /// Issue `method` against `url` with a form-encoded body (omitted when
    /// `form` is empty) and return the body.
    async fn send(
        &self,
        url: &str,
        method: Method,
        form: &[(&str, &str)],
    ) -> Result<String, TransportError>;

    /// Enable or disable response header capture for subsequent requests.
    fn capture_headers(&self, enabled: bool);

    /// Headers of the most recent request, in arrival order. Empty when
    /// capture was disabled for that request.
    fn captured_headers(&self) -> Vec<(String, String)>;
}

/// Form-encode a single value.
pub fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Decode a single form-encoded value.
///
/// This is the inverse of [`url_encode`]: `+` decodes to a space and a
/// literal plus must arrive as `%2B`. Raw `&` and `=` are kept as-is.
pub fn url_decode(value: &str) -> String {
    let pair = format!("v={}", value.replace('&', "%26"));
    url::form_urlencoded::parse(pair.as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}
