//! URL composition for the etcd v2 keys API.
//!
//! All requests target `<scheme>://<host>:<port>/v2/keys<key>`. Watches add
//! `?wait=true` and, once a cursor is known, `&waitIndex=<cursor+1>`.

use etcd_types::Index;
use thiserror::Error;

/// Path of the keys API on every etcd member.
pub const KEYS_PATH: &str = "/v2/keys";

/// Errors building request URLs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// The endpoint could not be parsed.
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// The endpoint as given.
        endpoint: String,
        /// Parser message.
        reason: String,
    },

    /// The endpoint scheme is not http or https.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// The endpoint has no host.
    #[error("endpoint has no host")]
    MissingHost,

    /// The key path is empty.
    #[error("key must not be empty")]
    EmptyKey,
}

/// The `/v2/keys` prefix of one etcd member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceUrl {
    prefix: String,
}

impl KeyspaceUrl {
    /// Plain-http prefix for `host:port`.
    pub fn new(host: &str, port: u16) -> Result<Self, UrlError> {
        if host.trim().is_empty() {
            return Err(UrlError::MissingHost);
        }
        Ok(Self {
            prefix: format!("http://{}:{}{}", host.trim(), port, KEYS_PATH),
        })
    }

    /// Prefix for a full endpoint such as `http://10.0.0.1:2379`.
    ///
    /// A missing port falls back to the scheme default. Any path on the
    /// endpoint is ignored.
    pub fn from_endpoint(endpoint: &str) -> Result<Self, UrlError> {
        let parsed = url::Url::parse(endpoint).map_err(|e| UrlError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(UrlError::UnsupportedScheme(scheme.to_string()));
        }

        let host = match parsed.host_str() {
            Some(h) if !h.is_empty() => h,
            _ => return Err(UrlError::MissingHost),
        };
        let port = parsed
            .port_or_known_default()
            .ok_or(UrlError::MissingHost)?;

        Ok(Self {
            prefix: format!("{}://{}:{}{}", scheme, host, port, KEYS_PATH),
        })
    }

    /// The prefix itself, e.g. `http://127.0.0.1:2379/v2/keys`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// URL of a key with no query string. Used for plain reads and for the
    /// snapshot fetch when a watch index has been cleared.
    pub fn key_url(&self, key: &str) -> String {
        if key.starts_with('/') {
            format!("{}{}", self.prefix, key)
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }

    /// Long-poll URL for a key.
    ///
    /// With a cursor the server answers with the first change after it;
    /// without one it answers on the next change of the key.
    pub fn watch_url(&self, key: &str, cursor: Option<Index>) -> String {
        let base = format!("{}?wait=true", self.key_url(key));
        match cursor {
            Some(index) => format!("{}&waitIndex={}", base, index.next()),
            None => base,
        }
    }
}

/// Reject empty key paths.
pub fn check_key(key: &str) -> Result<(), UrlError> {
    if key.is_empty() {
        return Err(UrlError::EmptyKey);
    }
    Ok(())
}
