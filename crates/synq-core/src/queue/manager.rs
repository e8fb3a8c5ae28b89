use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch, Notify};
use tokio::time::Instant;

use crate::command::Command;
use crate::retry::{
    Executed, ExecutionFailure, KindTable, RetryBudget, RetryDecision, RetryPolicy, Surfacing,
};

use super::events::{Admission, Completion, CommandEvent};
use super::state::QueueState;

/// Default upper bound on pending plus executing commands.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Backoff horizon used when a delay overflows `Instant` (about 30 years).
const FAR_FUTURE_SECS: u64 = 86_400 * 365 * 30;

/// The live queue: one producer side (`enqueue`), one worker side (`next` /
/// `complete`).
///
/// A single mutex covers the fingerprint check, insertion and removal, so two
/// concurrent enqueues of the same command cannot both succeed. The lock is
/// never held across an await or a connector call.
pub struct QueueManager {
    state: Mutex<QueueState>,
    table: Arc<KindTable>,
    retry: RetryPolicy,
    capacity: usize,
    available: Notify,
    idle: Notify,
    shutdown: watch::Sender<bool>,
    events: Option<mpsc::UnboundedSender<CommandEvent>>,
}

impl QueueManager {
    pub fn new(table: Arc<KindTable>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            state: Mutex::new(QueueState::default()),
            table,
            retry: RetryPolicy::default(),
            capacity: DEFAULT_CAPACITY,
            available: Notify::new(),
            idle: Notify::new(),
            shutdown,
            events: None,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Final outcomes of user-visible kinds are sent here.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<CommandEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn table(&self) -> &KindTable {
        &self.table
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offer a command; see [`Admission`].
    pub fn admit(&self, command: Command) -> Admission {
        if command.kind().is_sentinel() {
            tracing::warn!(command = %command, "refusing sentinel command");
            return Admission::Sentinel;
        }
        let fp = command.fingerprint();
        let priority = self.table.priority(command.kind());
        {
            let mut state = self.lock();
            if state.contains(&fp) {
                tracing::debug!(fingerprint = %fp.short(), kind = %command.kind(), "duplicate command ignored");
                return Admission::Duplicate;
            }
            if state.member_count() >= self.capacity {
                tracing::warn!(capacity = self.capacity, command = %command, "queue full, command refused");
                return Admission::Full;
            }
            tracing::debug!(command = %command, "command queued");
            state.insert_new(priority, command);
        }
        self.available.notify_one();
        Admission::Accepted
    }

    /// Returns true if the command was added, false for a duplicate or refusal.
    pub fn enqueue(&self, command: Command) -> bool {
        self.admit(command).is_accepted()
    }

    /// Take the highest-ordered pending command that is not backing off,
    /// without waiting.
    pub fn try_next(&self) -> Option<Command> {
        let mut state = self.lock();
        state.pop_next(Instant::now()).map(|(_, command)| command)
    }

    /// Wait for the next due command. Returns `None` once shutdown is
    /// requested, even if commands are still pending (they are left for the save).
    pub async fn next(&self) -> Option<Command> {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            if *shutdown.borrow_and_update() {
                return None;
            }
            let next_due = {
                let mut state = self.lock();
                match state.pop_next(Instant::now()) {
                    Some((_, command)) => {
                        tracing::trace!(command = %command, "command dequeued");
                        return Some(command);
                    }
                    None => state.next_due(),
                }
            };
            let backoff_over = async {
                match next_due {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                _ = self.available.notified() => {}
                _ = shutdown.changed() => {}
                _ = backoff_over => {}
            }
        }
    }

    /// Record the outcome of an executed command and re-queue or drop it.
    pub fn complete(
        &self,
        mut command: Command,
        outcome: Result<Executed, ExecutionFailure>,
    ) -> Completion {
        let policy = self.table.policy(command.kind());
        let fp = command.fingerprint();

        let completion = match outcome {
            Ok(done) => {
                command.result_mut().record_success(done.items_downloaded);
                self.lock().finish(&fp);
                tracing::debug!(command = %command, items = done.items_downloaded, "command succeeded");
                Completion::Succeeded
            }
            Err(failure) => {
                command.result_mut().record_failure(failure.message.clone());
                let retries = command.result().retries;
                match self.retry.decide(retries, failure.retriable, policy.budget) {
                    RetryDecision::RetryAfter(delay) => {
                        tracing::info!(
                            command = %command,
                            error = %failure,
                            retries,
                            "command failed, re-queued"
                        );
                        let now = Instant::now();
                        // A configured cap can exceed what `Instant` can represent.
                        let not_before = now
                            .checked_add(delay)
                            .unwrap_or_else(|| now + Duration::from_secs(FAR_FUTURE_SECS));
                        let requeued = self.lock().requeue(policy.priority, command, not_before);
                        if requeued {
                            self.available.notify_one();
                            return Completion::Requeued { retries, delay };
                        }
                        // An equal command was admitted meanwhile; it carries on instead.
                        tracing::debug!(fingerprint = %fp.short(), "newer duplicate already queued");
                        return Completion::Abandoned {
                            retries,
                            reason: "superseded by a newer duplicate".to_string(),
                        };
                    }
                    RetryDecision::NoRetry => {
                        self.lock().finish(&fp);
                        let reason = abandon_reason(&failure, policy.budget, retries);
                        match policy.surfacing {
                            Surfacing::Notify => tracing::warn!(
                                command = %command,
                                error = %failure,
                                "command abandoned: {}",
                                reason
                            ),
                            Surfacing::Log => tracing::info!(
                                command = %command,
                                error = %failure,
                                "command abandoned: {}",
                                reason
                            ),
                        }
                        Completion::Abandoned { retries, reason }
                    }
                }
            }
        };

        if policy.surfacing == Surfacing::Notify {
            let event = match &completion {
                Completion::Abandoned { reason, .. } => Some(CommandEvent::Abandoned {
                    command,
                    reason: reason.clone(),
                }),
                Completion::Succeeded => Some(CommandEvent::Succeeded(command)),
                Completion::Requeued { .. } => None,
            };
            if let (Some(tx), Some(event)) = (&self.events, event) {
                if tx.send(event).is_err() {
                    tracing::debug!("no listener for command events");
                }
            }
        }
        self.notify_if_idle();
        completion
    }

    /// Stop handing out commands. Wakes a worker parked in [`QueueManager::next`].
    pub fn request_shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::debug!("queue shutdown requested");
        }
        self.idle.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once a shutdown has been requested.
    pub async fn shutdown_requested(&self) {
        let mut rx = self.shutdown.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Wait until nothing is pending or executing, or shutdown is requested.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_idle() || self.is_shutting_down() {
                return;
            }
            notified.await;
        }
    }

    fn notify_if_idle(&self) {
        if self.is_idle() {
            self.idle.notify_waiters();
        }
    }

    pub fn is_idle(&self) -> bool {
        self.lock().member_count() == 0
    }

    /// Pending commands.
    pub fn len(&self) -> usize {
        self.lock().pending_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn executing_len(&self) -> usize {
        self.lock().executing_len()
    }

    /// Remove and return all pending commands in queue order.
    pub fn drain(&self) -> Vec<Command> {
        let drained = self.lock().drain();
        self.notify_if_idle();
        drained
    }

    /// Clones of the pending commands in queue order.
    pub fn snapshot(&self) -> Vec<Command> {
        self.lock().snapshot()
    }
}

fn abandon_reason(failure: &ExecutionFailure, budget: RetryBudget, retries: u32) -> String {
    if !failure.retriable {
        return format!("permanent failure: {}", failure.message);
    }
    match budget {
        RetryBudget::Bounded(max) => {
            format!("retry budget of {} exhausted after {} failures", max, retries)
        }
        RetryBudget::Unlimited => format!("gave up: {}", failure.message),
    }
}
