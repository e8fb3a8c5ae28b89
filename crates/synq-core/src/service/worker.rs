//! The single worker: take, execute outside the lock, complete.

use std::sync::Arc;

use crate::connector::Connector;
use crate::queue::{Completion, QueueManager};

/// Counters for one worker run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub executed: u64,
    pub succeeded: u64,
    pub requeued: u64,
    pub abandoned: u64,
}

/// Run until the queue is shut down. A command in flight when shutdown is
/// requested is finished and completed first, so a retriable failure lands
/// back in the pending set in time for the save.
///
/// Backoff is enforced by the queue: a requeued command is not handed out
/// again before its delay, while other due commands keep flowing.
pub(crate) async fn run_worker(queue: Arc<QueueManager>, connector: Arc<dyn Connector>) -> WorkerStats {
    let mut stats = WorkerStats::default();
    while let Some(command) = queue.next().await {
        tracing::debug!(command = %command, "executing");
        let outcome = connector.execute(&command).await;
        stats.executed += 1;
        match queue.complete(command, outcome) {
            Completion::Succeeded => stats.succeeded += 1,
            Completion::Abandoned { .. } => stats.abandoned += 1,
            Completion::Requeued { retries, delay } => {
                stats.requeued += 1;
                tracing::debug!(retries, delay_ms = delay.as_millis() as u64, "command backing off");
            }
        }
    }
    tracing::debug!(?stats, "worker stopped");
    stats
}
