//! Retry budgets, backoff and per-kind policy.
//!
//! The queue manager consults a [`KindTable`] to order commands and to
//! decide, after a connector failure, whether a command goes back into the
//! queue or is abandoned. Connectors only report whether a failure is
//! retriable; protocol errors are not interpreted here.

mod error;
mod policy;
mod table;

pub use error::{Executed, ExecutionFailure};
pub use policy::{RetryBudget, RetryDecision, RetryPolicy};
pub use table::{KindPolicy, KindTable, Surfacing, DEFAULT_POLICIES};
