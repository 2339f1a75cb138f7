//! Configuration for the etcd client and watch engine.
//!
//! Configuration can be built in code or loaded from a TOML file:
//!
//! ```toml
//! [server]
//! endpoint = "http://172.16.1.10:2379"
//!
//! [http]
//! connect_timeout_secs = 5
//!
//! [watch]
//! max_failures = 5
//! ```

use etcd_core::{KeyspaceUrl, UrlError, DEFAULT_MAX_FAILURES};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EtcdConfig {
    /// Which etcd member to talk to.
    #[serde(default)]
    pub server: ServerConfig,
    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,
    /// Watch engine settings.
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Client URL of an etcd member (default: http://127.0.0.1:2379).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds. Unset by default: long-polls may
    /// legitimately stay open for a very long time.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// TCP connect timeout in seconds (default: 5).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Maximum redirects followed per request (default: 10).
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Watch engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Consecutive failures tolerated by a continuous watch (default: 5).
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
}

// Default value functions
fn default_endpoint() -> String {
    "http://127.0.0.1:2379".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    concat!("etcdv2-client/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_failures() -> u32 {
    DEFAULT_MAX_FAILURES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            max_failures: default_max_failures(),
        }
    }
}

impl HttpConfig {
    /// Request timeout as a duration, if one is set.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl EtcdConfig {
    /// Configuration for the given endpoint with default settings.
    pub fn new(endpoint: &str) -> Self {
        Self {
            server: ServerConfig {
                endpoint: endpoint.to_string(),
            },
            ..Self::default()
        }
    }

    /// Plain-http configuration for `host:port`.
    pub fn from_host_port(host: &str, port: u16) -> Self {
        Self::new(&format!("http://{}:{}", host, port))
    }

    /// Set the failure budget of continuous watches.
    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.watch.max_failures = max_failures;
        self
    }

    /// Set a whole-request timeout.
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.http.request_timeout_secs = Some(secs);
        self
    }

    /// The `/v2/keys` prefix of the configured endpoint.
    pub fn keyspace(&self) -> Result<KeyspaceUrl, UrlError> {
        KeyspaceUrl::from_endpoint(&self.server.endpoint)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
