//! # etcd-client
//!
//! Client library for the etcd v2 keys API.
//!
//! This is the main library that applications use to read, write and watch
//! keys.
//!
//! ## Features
//!
//! - **One-shot operations**: get, set, compare-and-swap, directories, ...
//! - **Resilient watches**: long-poll loop that survives transient failures
//!   and recovers from cleared indexes with a fresh snapshot
//! - **Transport Abstraction**: Pluggable transport layer (reqwest, mock)
//! - **Pure State Machine**: Uses etcd-core for side-effect-free watch logic
//!
//! ## Example
//!
//! ```ignore
//! use etcdv2_client::{Client, EtcdConfig, Watch};
//!
//! let config = EtcdConfig::new("http://127.0.0.1:2379");
//! let client = Client::connect(&config)?;
//! client.set("/message", "hello").await?;
//!
//! let mut watch = Watch::connect(&config)?;
//! watch.run("/message", |reply| println!("{:?}", reply.value()), None).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod transport;
pub mod watch;

pub use client::{Client, ClientError};
pub use config::{ConfigError, EtcdConfig, HttpConfig, ServerConfig, WatchConfig};
pub use etcd_types::{DecodeError, Index, KvPairs, Node, Reply, ReplyError};
pub use transport::{
    url_decode, url_encode, HttpTransport, Method, MockRequest, MockTransport, Transport,
    TransportError,
};
pub use watch::Watch;
