//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use synq_core::command::Command;
use synq_core::config::SynqConfig;
use synq_core::connector::Connector;
use synq_core::context::SyncContext;
use synq_core::retry::{Executed, ExecutionFailure};

/// Config pointing at a database inside `dir`, with backoff long enough
/// that a requeued command waits for shutdown.
pub fn config_in(dir: &Path) -> SynqConfig {
    let mut cfg = SynqConfig::default();
    cfg.database_path = Some(dir.join("queue.db"));
    cfg.retry.base_delay_secs = 3600.0;
    cfg.retry.max_delay_secs = 3600;
    cfg
}

pub async fn context_in(dir: &Path) -> Arc<SyncContext> {
    Arc::new(SyncContext::initialize(config_in(dir)).await.unwrap())
}

/// Close the store so the next context reopens the file cleanly.
pub async fn close(ctx: Arc<SyncContext>) {
    match Arc::try_unwrap(ctx) {
        Ok(ctx) => ctx.teardown().await,
        Err(ctx) => ctx.store().close().await,
    }
}

/// Remembers every command it was handed and answers with a fixed outcome.
pub struct Recording {
    pub seen: Mutex<Vec<Command>>,
    outcome: Result<Executed, ExecutionFailure>,
}

impl Recording {
    pub fn succeeding() -> Arc<Self> {
        Self::with(Ok(Executed::items(1)))
    }

    pub fn failing_retriably() -> Arc<Self> {
        Self::with(Err(ExecutionFailure::retriable("network unreachable")))
    }

    fn with(outcome: Result<Executed, ExecutionFailure>) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            outcome,
        })
    }

    pub fn seen(&self) -> Vec<Command> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for Recording {
    async fn execute(&self, command: &Command) -> Result<Executed, ExecutionFailure> {
        self.seen.lock().unwrap().push(command.clone());
        self.outcome.clone()
    }
}
