//! The etcd modification index.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A monotonically increasing index assigned by etcd to every mutation.
///
/// Used as the cursor of a watch: after observing index `n`, the next
/// long-poll asks for `waitIndex=n+1`.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Index(u64);

impl Index {
    /// Wrap a raw index as reported by etcd.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw counter, as sent in `waitIndex`.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The index before the first mutation. etcd never assigns it, so it
    /// stands for "unknown".
    pub fn zero() -> Self {
        Self(0)
    }

    /// True when no mutation index is known.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// The index of the mutation following this one. Saturates at `u64::MAX`.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl From<u64> for Index {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Index({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_ordering() {
        let i1 = Index::new(100);
        let i2 = Index::new(200);
        assert!(i1 < i2);
        assert!(i2 > i1);
    }

    #[test]
    fn index_next() {
        assert_eq!(Index::new(42).next().value(), 43);
    }

    #[test]
    fn index_zero() {
        assert!(Index::zero().is_zero());
        assert!(!Index::new(1).is_zero());
        assert_eq!(Index::default(), Index::zero());
    }

    #[test]
    fn index_saturating_add() {
        let i = Index::new(u64::MAX);
        assert_eq!(i.next().value(), u64::MAX); // Saturates, doesn't wrap
    }

    #[test]
    fn index_display_and_debug() {
        let i = Index::new(7);
        assert_eq!(i.to_string(), "7");
        assert_eq!(format!("{:?}", i), "Index(7)");
    }

    #[test]
    fn index_deserializes_from_plain_number() {
        let i: Index = serde_json::from_str("1234").unwrap();
        assert_eq!(i, Index::new(1234));
    }
}
