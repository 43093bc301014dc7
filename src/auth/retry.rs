//! Bounded authentication retry budget.

use std::sync::atomic::{AtomicU32, Ordering};

/// Default number of credential prompts a handler may issue.
pub const MAX_AUTH_ATTEMPTS: u32 = 3;

/// Per-handler attempt counter.
///
/// The counter starts at zero, grows by one per authentication attempt and is
/// never reset: once a handler has spent its budget it stops prompting for
/// the rest of its lifetime.
#[derive(Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    attempts: AtomicU32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Attempts consumed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Consume one attempt, returning the new count.
    pub fn increment(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    /// Whether the attempt numbered `count` is past the budget.
    ///
    /// Attempts `1..=max` may prompt; attempt `max + 1` is the first refused.
    pub fn is_exhausted(&self, count: u32) -> bool {
        count > self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_AUTH_ATTEMPTS)
    }
}
