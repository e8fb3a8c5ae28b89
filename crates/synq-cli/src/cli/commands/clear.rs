//! `synq clear` and `synq unlock` – manage the persisted queue.

use anyhow::Result;
use synq_core::context::SyncContext;

pub async fn run_clear(ctx: &SyncContext) -> Result<()> {
    let claim = ctx.store().claim().await?;
    let removed = ctx.store().clear().await;
    claim.release().await?;
    let removed = removed?;
    tracing::info!(removed, store = ctx.store().store_name(), "queue store cleared");
    println!("Removed {} queued command(s).", removed);
    Ok(())
}

/// Break a claim left behind by a `synq run` that did not shut down cleanly.
pub async fn run_unlock(ctx: &SyncContext) -> Result<()> {
    if ctx.store().break_claim().await? {
        println!("Queue unlocked.");
    } else {
        println!("Queue was not locked.");
    }
    Ok(())
}
