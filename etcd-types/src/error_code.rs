//! Numeric error codes returned by etcd in error bodies.
//!
//! Command errors are in the 1xx range, post-form errors in 2xx,
//! raft errors in 3xx and watch/index errors in 4xx.

/// Key not found.
pub const KEY_NOT_FOUND: u32 = 100;
/// Compare failed (`prevValue` / `prevIndex` mismatch).
pub const TEST_FAILED: u32 = 101;
/// Not a file.
pub const NOT_FILE: u32 = 102;
/// Not a directory.
pub const NOT_DIR: u32 = 104;
/// Key already exists.
pub const NODE_EXIST: u32 = 105;
/// Root is read only.
pub const ROOT_READ_ONLY: u32 = 107;
/// Directory not empty.
pub const DIR_NOT_EMPTY: u32 = 108;

/// `prevValue` is required in a compare-and-swap form.
pub const PREV_VALUE_REQUIRED: u32 = 201;
/// The given TTL is not a number.
pub const TTL_NAN: u32 = 202;
/// The given index is not a number.
pub const INDEX_NAN: u32 = 203;
/// Invalid field in the request.
pub const INVALID_FIELD: u32 = 209;

/// Raft internal error.
pub const RAFT_INTERNAL: u32 = 300;
/// Leader election in progress.
pub const LEADER_ELECT: u32 = 301;

/// Watcher was cleared due to a cluster recovery.
pub const WATCHER_CLEARED: u32 = 400;
/// The requested `waitIndex` is outdated and has been cleared from history.
pub const EVENT_INDEX_CLEARED: u32 = 401;
