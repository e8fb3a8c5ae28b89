//! Per-command execution bookkeeping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Retry count, last error and success counters for one command.
///
/// Owned 1:1 by its [`crate::command::Command`] and mutated only by the
/// execution step. Not part of the command's fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Failed execution attempts so far.
    #[serde(default)]
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Items fetched across all successful attempts.
    #[serde(default)]
    pub downloaded_count: u64,
    /// Unix seconds of the last attempt, successful or not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_executed_at: Option<i64>,
}

impl ExecutionResult {
    /// Start a fresh retry count. Called when a command is constructed.
    ///
    /// Takes no kind: `retries` counts up from zero for every kind, and the
    /// kind's [`crate::retry::RetryBudget`] is applied when a failure is
    /// judged (see [`crate::retry::RetryPolicy::decide`]). A reset therefore
    /// restores the full budget of whatever kind the command has.
    pub fn reset_retries(&mut self) {
        self.retries = 0;
        self.last_error = None;
    }

    /// Count one failed attempt.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.retries = self.retries.saturating_add(1);
        self.last_error = Some(error.into());
        self.last_executed_at = Some(unix_timestamp());
    }

    /// Record a successful attempt. `retries` is left as is: it counts attempts, not streaks.
    pub fn record_success(&mut self, items_downloaded: u64) {
        self.downloaded_count = self.downloaded_count.saturating_add(items_downloaded);
        self.last_executed_at = Some(unix_timestamp());
    }

    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "retries:{}", self.retries)?;
        if self.downloaded_count > 0 {
            write!(f, ",downloaded:{}", self.downloaded_count)?;
        }
        if let Some(err) = &self.last_error {
            write!(f, ",error:{}", err)?;
        }
        Ok(())
    }
}

/// Current time as Unix seconds.
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_increments_and_stamps() {
        let mut r = ExecutionResult::default();
        r.record_failure("timeout");
        r.record_failure("connection reset");
        assert_eq!(r.retries, 2);
        assert_eq!(r.last_error.as_deref(), Some("connection reset"));
        assert!(r.last_executed_at.is_some());
    }

    #[test]
    fn success_keeps_retry_count() {
        let mut r = ExecutionResult::default();
        r.record_failure("503");
        r.record_success(20);
        r.record_success(5);
        assert_eq!(r.retries, 1);
        assert_eq!(r.downloaded_count, 25);
    }

    #[test]
    fn reset_clears_retries_and_error_only() {
        let mut r = ExecutionResult::default();
        r.record_success(3);
        r.record_failure("boom");
        r.reset_retries();
        assert_eq!(r.retries, 0);
        assert!(!r.has_error());
        assert_eq!(r.downloaded_count, 3);
    }

    #[test]
    fn reset_restores_full_budget_for_any_kind() {
        use crate::retry::RetryBudget;

        let mut r = ExecutionResult::default();
        for _ in 0..3 {
            r.record_failure("timeout");
        }
        assert!(RetryBudget::Bounded(2).is_exhausted(r.retries));
        r.reset_retries();
        for budget in [RetryBudget::Bounded(0), RetryBudget::Bounded(2), RetryBudget::Unlimited] {
            assert!(!budget.is_exhausted(r.retries), "{:?}", budget);
        }
    }

    #[test]
    fn missing_fields_take_defaults() {
        let r: ExecutionResult = serde_json::from_str("{}").unwrap();
        assert_eq!(r, ExecutionResult::default());
    }
}
