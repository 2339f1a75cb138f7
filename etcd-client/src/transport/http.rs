//! HTTP transport on top of reqwest.

use super::{Method, Transport, TransportError};
use crate::config::HttpConfig;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::ConnectionFailed(e.to_string())
        } else if e.is_redirect() {
            TransportError::Redirect(e.to_string())
        } else if e.is_builder() {
            TransportError::InvalidUrl(e.to_string())
        } else if e.is_body() || e.is_decode() {
            TransportError::Body(e.to_string())
        } else {
            TransportError::RequestFailed(e.to_string())
        }
    }
}

/// Transport that talks to a real etcd member.
///
/// Reuses one connection pool for every request the owner makes.
#[derive(Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    capture: AtomicBool,
    headers: Mutex<Vec<(String, String)>>,
}

impl HttpTransport {
    /// Build a transport from HTTP settings.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Init`] if the underlying client cannot be
    /// built (e.g. the TLS backend fails to initialize).
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| TransportError::Init(e.to_string()))?;

        Ok(Self {
            http,
            capture: AtomicBool::new(false),
            headers: Mutex::new(Vec::new()),
        })
    }

    /// Whether header capture is currently enabled.
    pub fn is_capturing(&self) -> bool {
        self.capture.load(Ordering::SeqCst)
    }

    fn store_headers(&self, headers: Vec<(String, String)>) {
        *self.headers.lock().unwrap_or_else(PoisonError::into_inner) = headers;
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<String, TransportError> {
        // Headers from a previous request never leak into this one.
        self.store_headers(Vec::new());

        let response = request.send().await?;
        let status = response.status();

        if self.is_capturing() {
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            self.store_headers(headers);
        }

        let body = response.text().await?;
        tracing::trace!("response {} ({} bytes)", status, body.len());
        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        tracing::trace!("GET {}", url);
        self.execute(self.http.get(url)).await
    }

    async fn send(
        &self,
        url: &str,
        method: Method,
        form: &[(&str, &str)],
    ) -> Result<String, TransportError> {
        tracing::trace!("{} {}", method, url);
        let mut request = match method {
            Method::Put => self.http.put(url),
            Method::Post => self.http.post(url),
            Method::Delete => self.http.delete(url),
        };
        if !form.is_empty() {
            request = request.form(form);
        }
        self.execute(request).await
    }

    fn capture_headers(&self, enabled: bool) {
        self.capture.store(enabled, Ordering::SeqCst);
    }

    fn captured_headers(&self) -> Vec<(String, String)> {
        self.headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
