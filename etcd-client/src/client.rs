//! Client - one-shot operations on the etcd v2 keys API.
//!
//! Every operation is a single request/response exchange: the URL is built
//! from the configured keyspace, the request goes through the
//! [`Transport`], and the body is decoded into a [`Reply`].
//!
//! # Example
//!
//! ```ignore
//! use etcdv2_client::{Client, EtcdConfig};
//!
//! let client = Client::connect(&EtcdConfig::new("http://127.0.0.1:2379"))?;
//! client.set("/message", "hello").await?;
//! let reply = client.get("/message").await?;
//! assert_eq!(reply.value(), Some("hello"));
//! ```

use etcd_core::{check_key, KeyspaceUrl, UrlError};
use etcd_types::{DecodeError, Reply, ReplyError};
use thiserror::Error;

use crate::config::{ConfigError, EtcdConfig};
use crate::transport::{url_encode, HttpTransport, Method, Transport, TransportError};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(DecodeError),

    /// The server answered with an error body.
    #[error("{0}")]
    Reply(ReplyError),

    /// A request URL could not be built.
    #[error("url error: {0}")]
    Url(#[from] UrlError),

    /// The client could not be constructed.
    #[error("client init failed: {0}")]
    Init(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A continuous watch ran out of failure budget.
    #[error("watch failed or timed out after {failures} consecutive failures")]
    WatchFailed {
        /// Consecutive failures counted.
        failures: u32,
        /// Message of the last failure.
        last_error: Option<String>,
    },
}

impl From<DecodeError> for ClientError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::Server(reply) => ClientError::Reply(reply),
            other => ClientError::Decode(other),
        }
    }
}

impl ClientError {
    /// etcd error code, when the server reported one.
    pub fn error_code(&self) -> Option<u32> {
        match self {
            Self::Reply(e) => Some(e.error_code),
            _ => None,
        }
    }
}

/// Client for one-shot key operations.
///
/// Generic over the transport so tests can use [`crate::MockTransport`].
#[derive(Debug)]
pub struct Client<T: Transport> {
    keyspace: KeyspaceUrl,
    transport: T,
}

impl Client<HttpTransport> {
    /// Create a client talking HTTP to the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Init`] if the HTTP transport cannot be built
    /// and [`ClientError::Url`] if the endpoint is invalid.
    pub fn connect(config: &EtcdConfig) -> Result<Self, ClientError> {
        let transport =
            HttpTransport::new(&config.http).map_err(|e| ClientError::Init(e.to_string()))?;
        Self::new(config, transport)
    }
}

impl<T: Transport> Client<T> {
    /// Create a client with an explicit transport.
    pub fn new(config: &EtcdConfig, transport: T) -> Result<Self, ClientError> {
        Ok(Self {
            keyspace: config.keyspace()?,
            transport,
        })
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The keyspace URL prefix.
    pub fn keyspace(&self) -> &KeyspaceUrl {
        &self.keyspace
    }

    /// Read a key.
    pub async fn get(&self, key: &str) -> Result<Reply, ClientError> {
        check_key(key)?;
        self.fetch(&self.keyspace.key_url(key)).await
    }

    /// Create or replace a key.
    pub async fn set(&self, key: &str, value: &str) -> Result<Reply, ClientError> {
        self.put(key, &[("value", value)]).await
    }

    /// Create or replace a key that expires after `ttl` seconds.
    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl: u64) -> Result<Reply, ClientError> {
        let ttl = ttl.to_string();
        self.put(key, &[("value", value), ("ttl", &ttl)]).await
    }

    /// Create a key; fails with code 105 if it already exists.
    pub async fn add(&self, key: &str, value: &str) -> Result<Reply, ClientError> {
        self.put(key, &[("value", value), ("prevExist", "false")])
            .await
    }

    /// Replace an existing key; fails with code 100 if it does not exist.
    pub async fn update(&self, key: &str, value: &str) -> Result<Reply, ClientError> {
        self.put(key, &[("value", value), ("prevExist", "true")])
            .await
    }

    /// Replace a key only if its current value is `prev_value`.
    pub async fn compare_and_swap(
        &self,
        key: &str,
        value: &str,
        prev_value: &str,
    ) -> Result<Reply, ClientError> {
        self.put(key, &[("value", value), ("prevValue", prev_value)])
            .await
    }

    /// Remove a key.
    pub async fn delete(&self, key: &str) -> Result<Reply, ClientError> {
        check_key(key)?;
        self.remove(self.keyspace.key_url(key)).await
    }

    /// Remove a key only if its current value is `prev_value`.
    pub async fn compare_and_delete(
        &self,
        key: &str,
        prev_value: &str,
    ) -> Result<Reply, ClientError> {
        check_key(key)?;
        let url = format!(
            "{}?prevValue={}",
            self.keyspace.key_url(key),
            url_encode(prev_value)
        );
        self.remove(url).await
    }

    /// Create a directory.
    pub async fn add_directory(&self, key: &str) -> Result<Reply, ClientError> {
        self.put(key, &[("dir", "true")]).await
    }

    /// Read a directory and everything below it.
    pub async fn list_directory(&self, key: &str) -> Result<Reply, ClientError> {
        check_key(key)?;
        self.fetch(&format!("{}?recursive=true", self.keyspace.key_url(key)))
            .await
    }

    /// Remove a directory. Without `recursive` the directory must be empty.
    pub async fn delete_directory(&self, key: &str, recursive: bool) -> Result<Reply, ClientError> {
        check_key(key)?;
        let mut url = format!("{}?dir=true", self.keyspace.key_url(key));
        if recursive {
            url.push_str("&recursive=true");
        }
        self.remove(url).await
    }

    /// Create an in-order key under directory `dir`.
    pub async fn create_in_order(&self, dir: &str, value: &str) -> Result<Reply, ClientError> {
        check_key(dir)?;
        let body = self
            .transport
            .send(&self.keyspace.key_url(dir), Method::Post, &[("value", value)])
            .await?;
        Ok(Reply::from_body(&body)?)
    }

    async fn fetch(&self, url: &str) -> Result<Reply, ClientError> {
        let body = self.transport.get(url).await?;
        Ok(Reply::from_body(&body)?)
    }

    async fn put(&self, key: &str, form: &[(&str, &str)]) -> Result<Reply, ClientError> {
        check_key(key)?;
        let body = self
            .transport
            .send(&self.keyspace.key_url(key), Method::Put, form)
            .await?;
        Ok(Reply::from_body(&body)?)
    }

    async fn remove(&self, url: String) -> Result<Reply, ClientError> {
        let body = self.transport.send(&url, Method::Delete, &[]).await?;
        Ok(Reply::from_body(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockRequest, MockTransport};
    use etcd_types::error_code;

    const PREFIX: &str = "http://127.0.0.1:2379/v2/keys";

    fn client() -> (Client<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let client = Client::new(&EtcdConfig::default(), transport.clone()).unwrap();
        (client, transport)
    }

    fn node_reply(action: &str, key: &str, value: &str, index: u64) -> String {
        format!(
            r#"{{"action":"{action}","node":{{"key":"{key}","value":"{value}","modifiedIndex":{index},"createdIndex":{index}}}}}"#
        )
    }

    fn form(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn last(transport: &MockTransport) -> MockRequest {
        transport.last_request().unwrap()
    }

    // ===========================================
    // Read Tests
    // ===========================================

    #[tokio::test]
    async fn get_reads_key() {
        let (client, transport) = client();
        transport.queue_response(&node_reply("get", "/message", "hello", 7));

        let reply = client.get("/message").await.unwrap();

        assert_eq!(reply.value(), Some("hello"));
        assert_eq!(reply.modified_index().value(), 7);
        assert_eq!(last(&transport).method, "GET");
        assert_eq!(last(&transport).url, format!("{PREFIX}/message"));
    }

    #[tokio::test]
    async fn get_missing_key_is_reply_error() {
        let (client, transport) = client();
        transport.queue_response(
            r#"{"errorCode":100,"message":"Key not found","cause":"/nope","index":3}"#,
        );

        let err = client.get("/nope").await.unwrap_err();

        assert_eq!(err.error_code(), Some(error_code::KEY_NOT_FOUND));
        assert!(matches!(err, ClientError::Reply(ref e) if e.is_key_not_found()));
    }

    #[tokio::test]
    async fn list_directory_is_recursive_and_flattens() {
        let (client, transport) = client();
        transport.queue_response(
            r#"{"action":"get","node":{"key":"/dir","dir":true,"nodes":[
                {"key":"/dir/a","value":"1","modifiedIndex":2,"createdIndex":2},
                {"key":"/dir/sub","dir":true,"nodes":[
                    {"key":"/dir/sub/b","value":"2","modifiedIndex":3,"createdIndex":3}
                ]}
            ]}}"#,
        );

        let reply = client.list_directory("/dir").await.unwrap();

        assert_eq!(last(&transport).url, format!("{PREFIX}/dir?recursive=true"));
        let pairs = reply.kv_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs["/dir/a"], "1");
        assert_eq!(pairs["/dir/sub/b"], "2");
    }

    // ===========================================
    // Write Tests
    // ===========================================

    #[tokio::test]
    async fn set_puts_value() {
        let (client, transport) = client();
        transport.queue_response(&node_reply("set", "/message", "你好", 8));

        let reply = client.set("/message", "你好").await.unwrap();

        assert_eq!(reply.action(), "set");
        let req = last(&transport);
        assert_eq!(req.method, "PUT");
        assert_eq!(req.url, format!("{PREFIX}/message"));
        assert_eq!(req.form, form(&[("value", "你好")]));
    }

    #[tokio::test]
    async fn set_with_ttl_sends_ttl_field() {
        let (client, transport) = client();
        transport.queue_response(&node_reply("set", "/tmp", "x", 9));

        client.set_with_ttl("/tmp", "x", 30).await.unwrap();

        assert_eq!(last(&transport).form, form(&[("value", "x"), ("ttl", "30")]));
    }

    #[tokio::test]
    async fn add_and_update_use_prev_exist() {
        let (client, transport) = client();
        transport.queue_response(&node_reply("create", "/k", "1", 10));
        transport.queue_response(&node_reply("update", "/k", "2", 11));

        client.add("/k", "1").await.unwrap();
        assert_eq!(
            last(&transport).form,
            form(&[("value", "1"), ("prevExist", "false")])
        );

        client.update("/k", "2").await.unwrap();
        assert_eq!(
            last(&transport).form,
            form(&[("value", "2"), ("prevExist", "true")])
        );
    }

    #[tokio::test]
    async fn add_existing_key_reports_node_exist() {
        let (client, transport) = client();
        transport.queue_response(
            r#"{"errorCode":105,"message":"Key already exists","cause":"/k","index":12}"#,
        );

        let err = client.add("/k", "1").await.unwrap_err();
        assert_eq!(err.error_code(), Some(error_code::NODE_EXIST));
    }

    #[tokio::test]
    async fn compare_and_swap_sends_prev_value() {
        let (client, transport) = client();
        transport.queue_response(&node_reply("compareAndSwap", "/k", "new", 13));

        client.compare_and_swap("/k", "new", "old").await.unwrap();

        assert_eq!(
            last(&transport).form,
            form(&[("value", "new"), ("prevValue", "old")])
        );
    }

    #[tokio::test]
    async fn add_directory_sends_dir_flag() {
        let (client, transport) = client();
        transport.queue_response(r#"{"action":"set","node":{"key":"/d","dir":true}}"#);

        let reply = client.add_directory("/d").await.unwrap();

        assert!(reply.node().unwrap().dir);
        assert_eq!(last(&transport).form, form(&[("dir", "true")]));
    }

    #[tokio::test]
    async fn create_in_order_posts_to_directory() {
        let (client, transport) = client();
        transport.queue_response(&node_reply("create", "/queue/00000000000000000014", "job", 14));

        let reply = client.create_in_order("/queue", "job").await.unwrap();

        let req = last(&transport);
        assert_eq!(req.method, "POST");
        assert_eq!(req.url, format!("{PREFIX}/queue"));
        assert_eq!(reply.key(), Some("/queue/00000000000000000014"));
    }

    // ===========================================
    // Delete Tests
    // ===========================================

    #[tokio::test]
    async fn delete_has_no_form() {
        let (client, transport) = client();
        transport.queue_response(r#"{"action":"delete","node":{"key":"/k","modifiedIndex":15}}"#);

        client.delete("/k").await.unwrap();

        let req = last(&transport);
        assert_eq!(req.method, "DELETE");
        assert_eq!(req.url, format!("{PREFIX}/k"));
        assert!(req.form.is_empty());
    }

    #[tokio::test]
    async fn compare_and_delete_encodes_prev_value() {
        let (client, transport) = client();
        transport.queue_response(
            r#"{"action":"compareAndDelete","node":{"key":"/k","modifiedIndex":16}}"#,
        );

        client.compare_and_delete("/k", "a b&c").await.unwrap();

        assert_eq!(last(&transport).url, format!("{PREFIX}/k?prevValue=a+b%26c"));
    }

    #[tokio::test]
    async fn delete_directory_urls() {
        let (client, transport) = client();
        transport.queue_response(r#"{"action":"delete","node":{"key":"/d","dir":true}}"#);
        transport.queue_response(r#"{"action":"delete","node":{"key":"/d","dir":true}}"#);

        client.delete_directory("/d", false).await.unwrap();
        assert_eq!(last(&transport).url, format!("{PREFIX}/d?dir=true"));

        client.delete_directory("/d", true).await.unwrap();
        assert_eq!(
            last(&transport).url,
            format!("{PREFIX}/d?dir=true&recursive=true")
        );
    }

    // ===========================================
    // Error Condition Tests
    // ===========================================

    #[tokio::test]
    async fn empty_key_is_rejected_without_request() {
        let (client, transport) = client();

        let err = client.get("").await.unwrap_err();

        assert!(matches!(err, ClientError::Url(UrlError::EmptyKey)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn transport_error_is_propagated() {
        let (client, transport) = client();
        transport.queue_error(TransportError::Timeout);

        let err = client.set("/k", "v").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn empty_body_is_decode_error() {
        let (client, transport) = client();
        transport.queue_response("");

        let err = client.get("/k").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(DecodeError::Empty)));
        assert_eq!(err.error_code(), None);
    }

    #[test]
    fn invalid_endpoint_fails_construction() {
        let config = EtcdConfig::new("ftp://127.0.0.1:2379");
        let result = Client::new(&config, MockTransport::new());
        assert!(matches!(result, Err(ClientError::Url(_))));
    }

    #[test]
    fn watch_failed_message() {
        let err = ClientError::WatchFailed {
            failures: 5,
            last_error: Some("request timed out".into()),
        };
        assert_eq!(
            err.to_string(),
            "watch failed or timed out after 5 consecutive failures"
        );
    }
}
