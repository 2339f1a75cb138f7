//! Mock transport for testing.
//!
//! Allows queueing responses (with optional headers) and capturing issued
//! requests for verification.

use super::{Method, Transport, TransportError};
use async_trait::async_trait;
use etcd_core::parse_header_block;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A request seen by the mock transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    /// `GET`, `PUT`, `POST` or `DELETE`.
    pub method: String,
    /// Full request URL.
    pub url: String,
    /// Form fields, in the order given.
    pub form: Vec<(String, String)>,
}

#[derive(Debug)]
enum MockResponse {
    Body {
        body: String,
        headers: Vec<(String, String)>,
    },
    Error(TransportError),
}

/// Mock transport for testing.
///
/// Responses are served in FIFO order; an empty queue answers with
/// [`TransportError::ConnectionFailed`].
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    requests: Vec<MockRequest>,
    responses: VecDeque<MockResponse>,
    capture: bool,
    captured: Vec<(String, String)>,
    capture_toggles: Vec<bool>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a body to be returned by the next request.
    pub fn queue_response(&self, body: &str) {
        self.queue_response_with_headers(body, &[]);
    }

    /// Queue a body plus response headers.
    pub fn queue_response_with_headers(&self, body: &str, headers: &[(&str, &str)]) {
        let mut inner = self.lock();
        inner.responses.push_back(MockResponse::Body {
            body: body.to_string(),
            headers: headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
        });
    }

    /// Queue a body whose headers are given as a raw response header block,
    /// status line included, the way a wire capture records them.
    pub fn queue_response_with_header_block(&self, body: &str, block: &str) {
        let mut inner = self.lock();
        inner.responses.push_back(MockResponse::Body {
            body: body.to_string(),
            headers: parse_header_block(block),
        });
    }

    /// Queue a transport failure for the next request.
    pub fn queue_error(&self, error: TransportError) {
        let mut inner = self.lock();
        inner.responses.push_back(MockResponse::Error(error));
    }

    /// All requests issued so far.
    pub fn requests(&self) -> Vec<MockRequest> {
        let inner = self.lock();
        inner.requests.clone()
    }

    /// URLs of all requests issued so far.
    pub fn requested_urls(&self) -> Vec<String> {
        let inner = self.lock();
        inner.requests.iter().map(|r| r.url.clone()).collect()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<MockRequest> {
        let inner = self.lock();
        inner.requests.last().cloned()
    }

    /// Number of responses still queued.
    pub fn pending_responses(&self) -> usize {
        let inner = self.lock();
        inner.responses.len()
    }

    /// Whether header capture is currently enabled.
    pub fn is_capturing(&self) -> bool {
        let inner = self.lock();
        inner.capture
    }

    /// Every value passed to `capture_headers`, in order.
    pub fn capture_toggles(&self) -> Vec<bool> {
        let inner = self.lock();
        inner.capture_toggles.clone()
    }

    /// Clear all state (requests, queue, capture).
    pub fn reset(&self) {
        let mut inner = self.lock();
        *inner = MockTransportInner::default();
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond(&self, request: MockRequest) -> Result<String, TransportError> {
        let mut inner = self.lock();
        inner.requests.push(request);
        inner.captured.clear();

        match inner.responses.pop_front() {
            Some(MockResponse::Body { body, headers }) => {
                if inner.capture {
                    inner.captured = headers;
                }
                Ok(body)
            }
            Some(MockResponse::Error(error)) => Err(error),
            None => Err(TransportError::ConnectionFailed(
                "no response queued".into(),
            )),
        }
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        self.respond(MockRequest {
            method: "GET".into(),
            url: url.to_string(),
            form: Vec::new(),
        })
    }

    async fn send(
        &self,
        url: &str,
        method: Method,
        form: &[(&str, &str)],
    ) -> Result<String, TransportError> {
        self.respond(MockRequest {
            method: method.as_str().into(),
            url: url.to_string(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    fn capture_headers(&self, enabled: bool) {
        let mut inner = self.lock();
        inner.capture = enabled;
        inner.capture_toggles.push(enabled);
    }

    fn captured_headers(&self) -> Vec<(String, String)> {
        let inner = self.lock();
        inner.captured.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // MockTransport Basic Tests
    // ===========================================

    #[tokio::test]
    async fn mock_transport_serves_queued_responses_in_order() {
        let transport = MockTransport::new();
        transport.queue_response("first");
        transport.queue_response("second");

        assert_eq!(transport.get("http://a/1").await.unwrap(), "first");
        assert_eq!(transport.get("http://a/2").await.unwrap(), "second");
        assert_eq!(transport.pending_responses(), 0);
    }

    #[tokio::test]
    async fn mock_transport_records_requests() {
        let transport = MockTransport::new();
        transport.queue_response("{}");
        transport.queue_response("{}");

        transport.get("http://a/key?wait=true").await.unwrap();
        transport
            .send("http://a/key", Method::Put, &[("value", "v"), ("ttl", "5")])
            .await
            .unwrap();

        assert_eq!(
            transport.requested_urls(),
            vec!["http://a/key?wait=true", "http://a/key"]
        );
        let last = transport.last_request().unwrap();
        assert_eq!(last.method, "PUT");
        assert_eq!(
            last.form,
            vec![
                ("value".to_string(), "v".to_string()),
                ("ttl".to_string(), "5".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn empty_queue_returns_connection_failed() {
        let transport = MockTransport::new();
        let result = transport.get("http://a/key").await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
        // The request is still recorded
        assert_eq!(transport.requests().len(), 1);
    }

    // ===========================================
    // Error Condition Tests
    // ===========================================

    #[tokio::test]
    async fn queued_error_is_returned_once() {
        let transport = MockTransport::new();
        transport.queue_error(TransportError::Timeout);
        transport.queue_response("data");

        assert!(matches!(
            transport.get("http://a").await,
            Err(TransportError::Timeout)
        ));
        assert_eq!(transport.get("http://a").await.unwrap(), "data");
    }

    // ===========================================
    // Header Capture Tests
    // ===========================================

    #[tokio::test]
    async fn headers_only_captured_when_enabled() {
        let transport = MockTransport::new();
        transport.queue_response_with_headers("a", &[("X-Etcd-Index", "5")]);
        transport.queue_response_with_headers("b", &[("X-Etcd-Index", "6")]);

        transport.get("http://a").await.unwrap();
        assert!(transport.captured_headers().is_empty());

        transport.capture_headers(true);
        transport.get("http://a").await.unwrap();
        assert_eq!(
            transport.captured_headers(),
            vec![("X-Etcd-Index".to_string(), "6".to_string())]
        );
        assert_eq!(transport.capture_toggles(), vec![true]);
    }

    #[tokio::test]
    async fn captured_headers_cleared_by_next_request() {
        let transport = MockTransport::new();
        transport.capture_headers(true);
        transport.queue_response_with_headers("a", &[("X-Etcd-Index", "5")]);
        transport.get("http://a").await.unwrap();
        assert_eq!(transport.captured_headers().len(), 1);

        transport.queue_error(TransportError::Timeout);
        let _ = transport.get("http://a").await;
        assert!(transport.captured_headers().is_empty());
    }

    #[tokio::test]
    async fn header_block_is_split_into_pairs() {
        let transport = MockTransport::new();
        transport.capture_headers(true);
        transport.queue_response_with_header_block(
            "a",
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nX-Etcd-Index:  7 \r\n\r\n",
        );

        transport.get("http://a").await.unwrap();

        assert_eq!(
            transport.captured_headers(),
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Etcd-Index".to_string(), "7".to_string()),
            ]
        );
    }

    // ===========================================
    // Clone and Shared State Tests
    // ===========================================

    #[tokio::test]
    async fn mock_transport_clone_shares_state() {
        let transport1 = MockTransport::new();
        let transport2 = transport1.clone();

        transport1.queue_response("shared");
        assert_eq!(transport2.get("http://a").await.unwrap(), "shared");
        assert_eq!(transport1.requests().len(), 1);
    }

    #[tokio::test]
    async fn mock_transport_reset_clears_all() {
        let transport = MockTransport::new();
        transport.queue_response("x");
        transport.capture_headers(true);
        transport.get("http://a").await.unwrap();

        transport.reset();

        assert!(transport.requests().is_empty());
        assert!(!transport.is_capturing());
        assert_eq!(transport.pending_responses(), 0);
    }
}
