//! `synq run` – restore the queue, work on it, and save on exit.

use anyhow::Result;
use std::sync::Arc;
use synq_core::connector::{ConnectorRegistry, NullConnector};
use synq_core::context::SyncContext;
use synq_core::queue::CommandEvent;
use synq_core::service::SyncService;

pub async fn run_service(ctx: Arc<SyncContext>, until_idle: bool) -> Result<()> {
    // No protocol clients are built in; every origin gets the no-op connector.
    let registry = ConnectorRegistry::new(ctx.accounts()).register_all(Arc::new(NullConnector));

    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel::<CommandEvent>();
    let events_handle = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match event {
                CommandEvent::Succeeded(cmd) => println!("done: {}", cmd),
                CommandEvent::Abandoned { command, reason } => {
                    println!("failed: {} ({})", command, reason)
                }
            }
        }
    });

    let service = SyncService::start(Arc::clone(&ctx), Arc::new(registry), Some(events_tx)).await?;
    println!("Working on {} queued command(s).", service.queue().len());

    let stop = if until_idle {
        tokio::select! {
            _ = service.wait_idle() => Ok(()),
            r = tokio::signal::ctrl_c() => r,
        }
    } else {
        tokio::signal::ctrl_c().await
    };
    if let Err(e) = stop {
        tracing::warn!(error = %e, "signal handler failed, shutting down");
    }

    let report = service.shutdown().await;
    if let Err(e) = events_handle.await {
        tracing::warn!(error = %e, "event printer ended abnormally");
    }
    println!(
        "Executed {} ({} ok, {} retried, {} failed); {} left queued.",
        report.stats.executed,
        report.stats.succeeded,
        report.stats.requeued,
        report.stats.abandoned,
        report.persisted
    );
    Ok(())
}
