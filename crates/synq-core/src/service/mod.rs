//! Running the queue: restore, work, trigger, and shut down with one save.

mod trigger;
mod worker;

pub use worker::WorkerStats;

use anyhow::Result;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::connector::Connector;
use crate::context::SyncContext;
use crate::queue::{CommandEvent, QueueManager};
use crate::store::StoreClaim;

/// What a shutdown did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub stats: WorkerStats,
    /// Commands written to the store by the final save.
    pub persisted: usize,
}

/// A live queue with its worker and optional automatic-update trigger.
///
/// The service holds the store claim from start to shutdown. Dropping it
/// without calling [`SyncService::shutdown`] skips the final save, so pending
/// commands are lost and the claim stays behind until broken.
pub struct SyncService {
    ctx: Arc<SyncContext>,
    claim: StoreClaim,
    queue: Arc<QueueManager>,
    worker: JoinHandle<WorkerStats>,
    trigger: Option<JoinHandle<()>>,
}

impl SyncService {
    /// Claim the store, restore the saved queue and start working on it.
    ///
    /// Fails with [`crate::store::StoreBusy`] if another process owns the store.
    pub async fn start(
        ctx: Arc<SyncContext>,
        connector: Arc<dyn Connector>,
        events: Option<UnboundedSender<CommandEvent>>,
    ) -> Result<Self> {
        let claim = ctx.store().claim().await?;
        let queue = Arc::new(ctx.new_queue(events));
        let restored = ctx.store().load(&queue).await;
        tracing::info!(restored, pending = queue.len(), "sync service starting");

        let worker = tokio::spawn(worker::run_worker(Arc::clone(&queue), connector));
        let trigger = ctx.config().automatic_update_interval().map(|period| {
            tracing::debug!(period_secs = period.as_secs(), "automatic updates enabled");
            tokio::spawn(trigger::run_trigger(Arc::clone(&queue), period))
        });

        Ok(Self {
            ctx,
            claim,
            queue,
            worker,
            trigger,
        })
    }

    /// The live queue, for producers.
    pub fn queue(&self) -> &Arc<QueueManager> {
        &self.queue
    }

    /// Wait until nothing is pending or executing.
    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await;
    }

    /// Stop taking work, let the in-flight command finish, then save the
    /// remaining queue. Consuming `self` makes this the only save.
    pub async fn shutdown(self) -> ShutdownReport {
        self.queue.request_shutdown();

        if let Some(trigger) = self.trigger {
            if let Err(e) = trigger.await {
                tracing::warn!(error = %e, "automatic update trigger ended abnormally");
            }
        }
        let stats = match self.worker.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "worker task failed; its in-flight command is lost");
                WorkerStats::default()
            }
        };

        let persisted = self.ctx.store().save(&self.queue).await;
        if let Err(e) = self.claim.release().await {
            tracing::error!(error = %format!("{:#}", e), "failed to release queue store claim");
        }
        tracing::info!(
            executed = stats.executed,
            succeeded = stats.succeeded,
            abandoned = stats.abandoned,
            persisted,
            "sync service stopped"
        );
        ShutdownReport { stats, persisted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandKind};
    use crate::config::SynqConfig;
    use crate::connector::NullConnector;
    use crate::retry::{Executed, ExecutionFailure, KindTable};
    use crate::store::QueueStore;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::{mpsc, Notify, Semaphore};

    async fn context(cfg: SynqConfig) -> Arc<SyncContext> {
        let store = QueueStore::open_memory("test").await.unwrap();
        Arc::new(SyncContext::with_store(cfg, store).unwrap())
    }

    fn slow_retry_config() -> SynqConfig {
        let mut cfg = SynqConfig::default();
        cfg.retry.base_delay_secs = 3600.0;
        cfg.retry.max_delay_secs = 3600;
        cfg
    }

    /// Fails every command with a retriable error.
    struct AlwaysOffline;

    #[async_trait]
    impl Connector for AlwaysOffline {
        async fn execute(&self, _command: &Command) -> Result<Executed, ExecutionFailure> {
            Err(ExecutionFailure::retriable("offline"))
        }
    }

    /// Blocks each execution until a permit is released, then fails retriably.
    struct Gated {
        started: Notify,
        gate: Semaphore,
    }

    #[async_trait]
    impl Connector for Gated {
        async fn execute(&self, _command: &Command) -> Result<Executed, ExecutionFailure> {
            self.started.notify_one();
            let _permit = self.gate.acquire().await.map_err(|_| ExecutionFailure::permanent("closed"))?;
            Err(ExecutionFailure::retriable("timeout"))
        }
    }

    /// Fails status updates retriably and succeeds everything else.
    #[derive(Default)]
    struct PostsOffline {
        attempts: std::sync::Mutex<Vec<CommandKind>>,
    }

    impl PostsOffline {
        fn attempts_of(&self, kind: CommandKind) -> usize {
            self.attempts.lock().unwrap().iter().filter(|k| **k == kind).count()
        }
    }

    #[async_trait]
    impl Connector for PostsOffline {
        async fn execute(&self, command: &Command) -> Result<Executed, ExecutionFailure> {
            self.attempts.lock().unwrap().push(command.kind());
            if command.kind() == CommandKind::UpdateStatus {
                return Err(ExecutionFailure::retriable("offline"));
            }
            Ok(Executed::default())
        }
    }

    #[tokio::test]
    async fn retrying_post_does_not_starve_the_queue() {
        let ctx = context(SynqConfig::default()).await;
        let conn = Arc::new(PostsOffline::default());
        let service = SyncService::start(Arc::clone(&ctx), conn.clone(), None).await.unwrap();
        service.queue().enqueue(Command::post_status("alice", "hi", 0, 0));
        service.queue().enqueue(Command::follow_user("alice", 3));

        tokio::time::timeout(Duration::from_secs(5), async {
            while conn.attempts_of(CommandKind::FollowUser) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("follow never ran behind the failing post");
        // Backoff keeps the post from spinning.
        assert!(conn.attempts_of(CommandKind::UpdateStatus) <= 2);

        let report = service.shutdown().await;
        assert_eq!(report.persisted, 1);
    }

    #[tokio::test]
    async fn restores_and_drains_saved_queue() {
        let ctx = context(SynqConfig::default()).await;
        let seed = ctx.new_queue(None);
        seed.enqueue(Command::follow_user("alice", 1));
        seed.enqueue(Command::post_status("alice", "hi", 0, 0));
        assert_eq!(ctx.store().save(&seed).await, 2);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let service = SyncService::start(Arc::clone(&ctx), Arc::new(NullConnector), Some(tx)).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), service.wait_idle())
            .await
            .expect("queue never went idle");
        let report = service.shutdown().await;

        assert_eq!(report.stats.executed, 2);
        assert_eq!(report.stats.succeeded, 2);
        assert_eq!(report.persisted, 0);
        let first = rx.recv().await.unwrap();
        assert_eq!(first.command().kind(), CommandKind::UpdateStatus);
        assert!(ctx.store().peek().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_persists_backed_off_commands() {
        let ctx = context(slow_retry_config()).await;
        let service = SyncService::start(Arc::clone(&ctx), Arc::new(AlwaysOffline), None).await.unwrap();
        service.queue().enqueue(Command::post_status("alice", "retry me", 0, 0));
        // Wait for the first failure to put it back in the pending set.
        while service
            .queue()
            .snapshot()
            .first()
            .map_or(true, |c| c.result().retries == 0)
        {
            tokio::task::yield_now().await;
        }

        let report = tokio::time::timeout(Duration::from_secs(5), service.shutdown())
            .await
            .expect("shutdown waited out the backoff");
        assert_eq!(report.stats.requeued, 1);
        assert_eq!(report.persisted, 1);

        let rows = ctx.store().peek().await.unwrap();
        let saved = rows[0].decoded.as_ref().unwrap();
        assert_eq!(saved.status_text(), Some("retry me"));
        assert_eq!(saved.result().retries, 1);
        assert_eq!(saved.result().last_error.as_deref(), Some("offline"));
    }

    #[tokio::test]
    async fn in_flight_failure_during_shutdown_is_saved() {
        let ctx = context(slow_retry_config()).await;
        let gated = Arc::new(Gated {
            started: Notify::new(),
            gate: Semaphore::new(0),
        });
        let service = SyncService::start(Arc::clone(&ctx), gated.clone(), None).await.unwrap();
        service.queue().enqueue(Command::follow_user("alice", 7));
        gated.started.notified().await;

        let shutting_down = tokio::spawn(service.shutdown());
        tokio::task::yield_now().await;
        gated.gate.add_permits(1);
        let report = tokio::time::timeout(Duration::from_secs(5), shutting_down)
            .await
            .expect("shutdown hung")
            .unwrap();

        assert_eq!(report.stats.executed, 1);
        assert_eq!(report.persisted, 1);
        let rows = ctx.store().peek().await.unwrap();
        assert_eq!(rows[0].decoded.as_ref().unwrap().item_id(), 7);
    }

    #[tokio::test]
    async fn running_service_owns_the_store() {
        let ctx = context(SynqConfig::default()).await;
        let service = SyncService::start(Arc::clone(&ctx), Arc::new(NullConnector), None).await.unwrap();

        let err = match SyncService::start(Arc::clone(&ctx), Arc::new(NullConnector), None).await {
            Ok(_) => panic!("second service started on a claimed store"),
            Err(e) => e,
        };
        assert!(err.downcast_ref::<crate::store::StoreBusy>().is_some());
        assert!(ctx.store().claim().await.is_err());

        service.shutdown().await;
        ctx.store().claim().await.unwrap().release().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_enqueues_automatic_update() {
        let queue = Arc::new(QueueManager::new(Arc::new(KindTable::default())));
        let task = tokio::spawn(trigger::run_trigger(Arc::clone(&queue), Duration::from_secs(900)));

        tokio::time::sleep(Duration::from_secs(901)).await;
        let queued = queue.snapshot();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].kind(), CommandKind::AutomaticUpdate);

        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(queue.len(), 1, "second tick is a duplicate");

        queue.request_shutdown();
        task.await.unwrap();
    }
}
