//! Decoded etcd v2 response bodies.
//!
//! Every keys API call answers with the same JSON shape:
//!
//! ```json
//! {"action":"set","node":{"key":"/message","value":"hello","modifiedIndex":42,"createdIndex":42},
//!  "prevNode":{"key":"/message","value":"bye","modifiedIndex":41,"createdIndex":41}}
//! ```
//!
//! or, on failure, an error body with an `errorCode` field.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DecodeError, ReplyError};
use crate::index::Index;

/// Flattened view of a reply: leaf key to value, ordered by key.
pub type KvPairs = BTreeMap<String, String>;

/// A key or directory in the etcd keyspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Full path of the key. Empty for the root directory.
    #[serde(default)]
    pub key: String,
    /// Value of a file node. `None` for directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Whether this node is a directory.
    #[serde(default)]
    pub dir: bool,
    /// Children of a directory node (only present on directory listings).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    /// Index at which the node was created.
    #[serde(default)]
    pub created_index: Index,
    /// Index of the latest modification of the node.
    #[serde(default)]
    pub modified_index: Index,
    /// Remaining time-to-live in seconds, for expiring keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    /// Expiration timestamp (RFC 3339), for expiring keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

impl Node {
    /// Collect every leaf key/value below (and including) this node.
    fn collect_into(&self, out: &mut KvPairs) {
        if self.dir {
            for child in &self.nodes {
                child.collect_into(out);
            }
        } else if let Some(value) = &self.value {
            out.insert(self.key.clone(), value.clone());
        }
    }
}

/// A successful reply from the keys API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    /// The action that produced this reply (`get`, `set`, `delete`, `expire`, ...).
    #[serde(default)]
    pub action: String,
    /// The node affected by the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,
    /// The node's previous state, for mutating actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_node: Option<Node>,
}

impl Reply {
    /// Decode a response body.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Server`] if the body carries an `errorCode`,
    /// [`DecodeError::Empty`] for an empty body and [`DecodeError::Json`]
    /// for anything that is not a reply.
    pub fn from_body(body: &str) -> Result<Self, DecodeError> {
        if body.trim().is_empty() {
            return Err(DecodeError::Empty);
        }

        let value: serde_json::Value = serde_json::from_str(body)?;
        if value.get("errorCode").is_some() {
            let error: ReplyError = serde_json::from_value(value)?;
            return Err(DecodeError::Server(error));
        }

        Ok(serde_json::from_value(value)?)
    }

    /// The action that produced this reply.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The affected node, if any.
    pub fn node(&self) -> Option<&Node> {
        self.node.as_ref()
    }

    /// The previous node, if any.
    pub fn prev_node(&self) -> Option<&Node> {
        self.prev_node.as_ref()
    }

    /// Key of the affected node.
    pub fn key(&self) -> Option<&str> {
        self.node.as_ref().map(|n| n.key.as_str())
    }

    /// Value of the affected node.
    pub fn value(&self) -> Option<&str> {
        self.node.as_ref().and_then(|n| n.value.as_deref())
    }

    /// Modification index of the affected node, zero when there is no node.
    pub fn modified_index(&self) -> Index {
        self.node
            .as_ref()
            .map(|n| n.modified_index)
            .unwrap_or_default()
    }

    /// Flatten the node tree into leaf key/value pairs.
    pub fn kv_pairs(&self) -> KvPairs {
        let mut out = KvPairs::new();
        if let Some(node) = &self.node {
            node.collect_into(&mut out);
        }
        out
    }

    /// Same as [`Reply::kv_pairs`], but appends into an existing map.
    pub fn get_all(&self, out: &mut KvPairs) {
        if let Some(node) = &self.node {
            node.collect_into(out);
        }
    }
}
