//! # etcd-core
//!
//! Pure logic for the etcd v2 watch client (no I/O, instant tests).
//!
//! This crate implements the watch state machine and the small algorithms
//! around it (URL composition, failure budget, header index extraction)
//! without any network I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. The actual long-poll requests are performed by
//! `etcd-client`, which interprets the actions produced by [`WatchSession`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod budget;
pub mod headers;
pub mod keyspace;
pub mod session;

pub use budget::{FailureBudget, DEFAULT_MAX_FAILURES};
pub use headers::{etcd_index, parse_header_block, ETCD_INDEX_HEADER};
pub use keyspace::{check_key, KeyspaceUrl, UrlError};
pub use session::{WatchAction, WatchEvent, WatchMode, WatchSession};
