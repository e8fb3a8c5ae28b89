//! Live command queue.
//!
//! Commands move `queued → executing → {succeeded | requeued | abandoned}`.
//! The queue holds at most one command per fingerprint across its pending
//! and executing sets, orders pending commands by kind priority then
//! arrival, and applies the kind's retry budget when a command fails.

mod events;
mod manager;
mod state;

pub use events::{Admission, Completion, CommandEvent};
pub use manager::{QueueManager, DEFAULT_CAPACITY};
