//! Extraction of the current etcd index from response headers.
//!
//! Every etcd response carries `X-Etcd-Index`, the index of the latest
//! mutation in the whole store. After a stale-index error the watch resumes
//! from this value.

use etcd_types::Index;

/// Name of the header carrying the store-wide index.
pub const ETCD_INDEX_HEADER: &str = "X-Etcd-Index";

/// Find the index in a list of `(name, value)` headers.
///
/// Names match case-insensitively. Only the first matching header is
/// considered: if its value does not parse, the result is `None`.
pub fn etcd_index<'a, I>(headers: I) -> Option<Index>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    headers
        .into_iter()
        .find(|(name, _)| name.trim().eq_ignore_ascii_case(ETCD_INDEX_HEADER))
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
        .map(Index::new)
}

/// Split a raw header block into ordered `(name, value)` pairs.
///
/// Status lines (`HTTP/1.1 200 OK`), blank lines and lines without a colon
/// are skipped.
pub fn parse_header_block(raw: &str) -> Vec<(String, String)> {
    raw.lines()
        .filter(|line| !line.starts_with("HTTP/"))
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}
