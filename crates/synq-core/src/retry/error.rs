//! Outcome types at the connector boundary.

/// A successful execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Executed {
    pub items_downloaded: u64,
}

impl Executed {
    pub fn items(items_downloaded: u64) -> Self {
        Self { items_downloaded }
    }
}

/// A failed execution. The queue only looks at `retriable`; the message is
/// kept for the command's result and logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExecutionFailure {
    pub message: String,
    pub retriable: bool,
}

impl ExecutionFailure {
    /// Transient failure (timeout, throttling, connection reset...).
    pub fn retriable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retriable: true,
        }
    }

    /// Failure that will not go away by trying again.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retriable: false,
        }
    }
}
