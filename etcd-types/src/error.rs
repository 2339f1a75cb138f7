//! Error types for decoding etcd replies.

use serde::Deserialize;
use thiserror::Error;

use crate::error_code;

/// A server-side error encoded in a response body.
///
/// ```json
/// {"errorCode":401,"message":"The event in requested index is outdated and cleared","cause":"the requested history has been cleared [1008/4]","index":2007}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Error)]
#[error("etcd error {error_code}: {message}{}", cause_suffix(.cause))]
pub struct ReplyError {
    /// Numeric error code (see [`crate::error_code`]).
    #[serde(rename = "errorCode")]
    pub error_code: u32,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Additional detail, usually the offending key.
    #[serde(default)]
    pub cause: Option<String>,
    /// The etcd index at the time of the error.
    #[serde(default)]
    pub index: u64,
}

fn cause_suffix(cause: &Option<String>) -> String {
    match cause {
        Some(c) if !c.is_empty() => format!(" ({c})"),
        _ => String::new(),
    }
}

impl ReplyError {
    /// True when the requested watch index has aged out of the server's history.
    pub fn is_index_cleared(&self) -> bool {
        self.error_code == error_code::EVENT_INDEX_CLEARED
    }

    /// True when the key does not exist.
    pub fn is_key_not_found(&self) -> bool {
        self.error_code == error_code::KEY_NOT_FOUND
    }
}

/// Errors that can occur while decoding a response body into a reply.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body encodes a server-side error.
    #[error("{0}")]
    Server(#[from] ReplyError),

    /// The body was empty (etcd going down or the cluster reinitializing).
    #[error("empty reply")]
    Empty,

    /// The body is not valid JSON or not a recognized reply.
    #[error("invalid reply: {0}")]
    Json(#[from] serde_json::Error),
}

impl DecodeError {
    /// The numeric error code, if the body encoded a server-side error.
    pub fn error_code(&self) -> Option<u32> {
        match self {
            Self::Server(e) => Some(e.error_code),
            _ => None,
        }
    }

    /// True when this is the "event index cleared" condition.
    pub fn is_index_cleared(&self) -> bool {
        matches!(self, Self::Server(e) if e.is_index_cleared())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_error_display() {
        let err = ReplyError {
            error_code: 100,
            message: "Key not found".into(),
            cause: Some("/foo".into()),
            index: 7,
        };
        assert_eq!(err.to_string(), "etcd error 100: Key not found (/foo)");
    }

    #[test]
    fn reply_error_display_without_cause() {
        let err = ReplyError {
            error_code: 300,
            message: "Raft Internal Error".into(),
            cause: None,
            index: 0,
        };
        assert_eq!(err.to_string(), "etcd error 300: Raft Internal Error");
    }

    #[test]
    fn index_cleared_is_401_only() {
        let mut err = ReplyError {
            error_code: 401,
            message: String::new(),
            cause: None,
            index: 0,
        };
        assert!(err.is_index_cleared());
        assert!(DecodeError::from(err.clone()).is_index_cleared());

        err.error_code = 400;
        assert!(!err.is_index_cleared());
        assert!(!DecodeError::Empty.is_index_cleared());
    }

    #[test]
    fn decode_error_exposes_code() {
        let err = DecodeError::Server(ReplyError {
            error_code: 105,
            message: "Key already exists".into(),
            cause: None,
            index: 3,
        });
        assert_eq!(err.error_code(), Some(105));
        assert_eq!(DecodeError::Empty.error_code(), None);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DecodeError>();
        assert_send_sync::<ReplyError>();
    }
}
