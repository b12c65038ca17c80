// src/exec/retry.rs

use std::time::Duration;

use crate::config::model::{DEFAULT_RETRY_BASE, DEFAULT_RETRY_MAX_BACKOFF};

/// Exponential backoff between attempts of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(base: Duration, max_backoff: Duration) -> Self {
        Self { base, max_backoff }
    }

    /// Delay before the attempt with zero-based index `attempt`:
    /// `base * 2^attempt`, capped at `max_backoff`.
    ///
    /// The first retry (`attempt == 1`) therefore waits `2 * base`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_BASE, DEFAULT_RETRY_MAX_BACKOFF)
    }
}
