use std::time::Duration;

/// How many times a failed command may be re-queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryBudget {
    /// Re-queue on every retriable failure.
    Unlimited,
    /// Re-queue after each of the first N failures; the (N+1)th abandons.
    Bounded(u32),
}

impl RetryBudget {
    /// True once `retries` failed attempts exceed the budget.
    pub fn is_exhausted(self, retries: u32) -> bool {
        match self {
            RetryBudget::Unlimited => false,
            RetryBudget::Bounded(max) => retries > max,
        }
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Abandon the command.
    NoRetry,
    /// Re-queue; the worker should wait this long before the next attempt.
    RetryAfter(Duration),
}

/// Exponential backoff between attempts, with a cap.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Decide what to do after a failure.
    ///
    /// `retries` is the failure count *including* the one just recorded.
    pub fn decide(&self, retries: u32, retriable: bool, budget: RetryBudget) -> RetryDecision {
        if !retriable || budget.is_exhausted(retries) {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff(retries))
    }

    /// base * 2^(retries-1), capped.
    pub fn backoff(&self, retries: u32) -> Duration {
        let exp = 1u32 << retries.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(exp).min(self.max_delay)
    }
}
