//! Outcomes reported by the queue manager.

use std::time::Duration;

use crate::command::Command;

/// Result of offering a command to the live queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// An equal command is already pending or executing; it was kept as is.
    Duplicate,
    /// The queue is at capacity.
    Full,
    /// `empty` and `unknown` commands never enter the queue.
    Sentinel,
}

impl Admission {
    pub fn is_accepted(self) -> bool {
        self == Admission::Accepted
    }
}

/// What `complete` did with a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    /// Back in the pending set; the worker should wait `delay` before its next attempt.
    Requeued { retries: u32, delay: Duration },
    /// Dropped after a permanent failure or an exhausted retry budget.
    Abandoned { retries: u32, reason: String },
}

/// Final outcome of a command, sent to the producer for user-visible kinds.
#[derive(Debug, Clone)]
pub enum CommandEvent {
    Succeeded(Command),
    Abandoned { command: Command, reason: String },
}

impl CommandEvent {
    pub fn command(&self) -> &Command {
        match self {
            CommandEvent::Succeeded(c) => c,
            CommandEvent::Abandoned { command, .. } => command,
        }
    }
}
