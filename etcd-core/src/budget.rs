//! Bounded failure counter for continuous watches.

/// Consecutive failures tolerated by a continuous watch before it aborts.
pub const DEFAULT_MAX_FAILURES: u32 = 5;

/// Counts down on every failed watch iteration and refills on success.
///
/// A stale-index event still spends one unit even when the snapshot fetch
/// that follows it succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureBudget {
    max: u32,
    remaining: u32,
}

impl FailureBudget {
    /// Create a full budget of `max` failures.
    pub fn new(max: u32) -> Self {
        Self {
            max,
            remaining: max,
        }
    }

    /// Spend one unit. Returns `true` if the budget is now exhausted.
    pub fn spend(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.is_exhausted()
    }

    /// Refill to the maximum.
    pub fn reset(&mut self) {
        self.remaining = self.max;
    }

    /// Whether no failures are left.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Failures left before exhaustion.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// The configured maximum.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Failures spent since the last reset.
    pub fn spent(&self) -> u32 {
        self.max - self.remaining
    }
}

impl Default for FailureBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAILURES)
    }
}
