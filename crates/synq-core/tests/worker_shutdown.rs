//! Integration test: shutdown behaviour of a running service.

mod common;

use std::sync::Arc;
use std::time::Duration;

use synq_core::command::{Command, CommandKind};
use synq_core::queue::CommandEvent;
use synq_core::service::SyncService;
use tempfile::tempdir;
use tokio::sync::mpsc;

#[tokio::test]
async fn idle_worker_shuts_down_promptly_and_saves_nothing() {
    let dir = tempdir().unwrap();
    let ctx = common::context_in(dir.path()).await;
    let service = SyncService::start(Arc::clone(&ctx), common::Recording::succeeding(), None)
        .await
        .unwrap();

    let report = tokio::time::timeout(Duration::from_secs(5), service.shutdown())
        .await
        .expect("parked worker ignored shutdown");
    assert_eq!(report.stats.executed, 0);
    assert_eq!(report.persisted, 0);
    assert!(ctx.store().peek().await.unwrap().is_empty());
    common::close(ctx).await;
}

#[tokio::test]
async fn abandoned_user_visible_command_is_reported() {
    let dir = tempdir().unwrap();
    let mut cfg = common::config_in(dir.path());
    cfg.retry.base_delay_secs = 0.0;
    cfg.retry.max_delay_secs = 0;
    let ctx = Arc::new(synq_core::context::SyncContext::initialize(cfg).await.unwrap());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let offline = common::Recording::failing_retriably();
    let service = SyncService::start(Arc::clone(&ctx), offline.clone(), Some(tx))
        .await
        .unwrap();
    service.queue().enqueue(Command::search("bob", "weather"));

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no event")
        .unwrap();
    match event {
        CommandEvent::Abandoned { command, reason } => {
            assert_eq!(command.kind(), CommandKind::SearchMessage);
            assert_eq!(command.result().retries, 3);
            assert!(reason.contains("exhausted"), "{}", reason);
        }
        other => panic!("unexpected event {:?}", other),
    }
    // Budget 2: the first attempt plus two retries.
    assert_eq!(offline.seen().len(), 3);

    let report = service.shutdown().await;
    assert_eq!(report.stats.abandoned, 1);
    assert_eq!(report.persisted, 0);
    common::close(ctx).await;
}
