//! # etcd-types
//!
//! Wire format types for the etcd v2 keys API.
//!
//! This crate provides the foundational types used across all etcdv2 crates:
//! - [`Index`] - The modification counter used as a watch cursor
//! - [`Reply`], [`Node`] - Decoded response bodies
//! - [`ReplyError`], [`DecodeError`] - Server-side and decoding errors
//! - [`error_code`] - The numeric error vocabulary of the service

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error_code;

mod error;
mod index;
mod reply;

pub use error::{DecodeError, ReplyError};
pub use index::Index;
pub use reply::{KvPairs, Node, Reply};
