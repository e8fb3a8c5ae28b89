//! Periodic automatic-update trigger.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::command::Command;
use crate::queue::QueueManager;

/// Enqueue an automatic update every `period` until shutdown. The first one
/// fires one period after start. A tick while the previous update is still
/// queued is absorbed by the duplicate check.
pub(crate) async fn run_trigger(queue: Arc<QueueManager>, period: Duration) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticks.tick() => {
                if queue.enqueue(Command::automatic_update()) {
                    tracing::debug!("automatic update queued");
                }
            }
            _ = queue.shutdown_requested() => break,
        }
    }
    tracing::debug!("automatic update trigger stopped");
}
