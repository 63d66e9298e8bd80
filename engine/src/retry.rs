//! Retry budget and exponential backoff for transient replay failures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of attempts before a mutation is given up on.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default backoff base.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// How many times a mutation is retried and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// A mutation whose `retries + 1` reaches this value is dropped
    pub max_retries: u32,
    /// Backoff base; the delay after the n-th failure is `base_delay * 2^n`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

/// What to do with a mutation after a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Keep it with the new retry count and wait `delay` before moving on.
    Retry { retries: u32, delay: Duration },
    /// The budget is spent; remove it.
    GiveUp,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Decide the fate of a mutation that has failed `retries` times before.
    pub fn decide(&self, retries: u32) -> RetryDecision {
        let attempts = retries.saturating_add(1);
        if attempts >= self.max_retries {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry {
                retries: attempts,
                delay: self.backoff(attempts),
            }
        }
    }

    /// `base_delay * 2^retries`, saturating instead of overflowing.
    pub fn backoff(&self, retries: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retries))
    }
}
