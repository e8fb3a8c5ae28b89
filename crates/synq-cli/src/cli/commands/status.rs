//! `synq status` – list the persisted queue without consuming it.

use anyhow::Result;
use synq_core::context::SyncContext;

pub async fn run_status(ctx: &SyncContext) -> Result<()> {
    let records = ctx.store().peek().await?;
    if records.is_empty() {
        println!("No queued commands in store {:?}.", ctx.store().store_name());
        return Ok(());
    }
    println!(
        "{:<5} {:<24} {:<20} {:<8} {}",
        "IDX", "KIND", "ACCOUNT", "RETRIES", "DETAIL"
    );
    for r in records {
        match r.decoded {
            Ok(cmd) => {
                let detail = cmd
                    .status_text()
                    .or_else(|| cmd.search_query())
                    .map(str::to_string)
                    .or_else(|| cmd.result().last_error.clone())
                    .unwrap_or_default();
                let account = if cmd.account_name().is_empty() {
                    "-"
                } else {
                    cmd.account_name()
                };
                println!(
                    "{:<5} {:<24} {:<20} {:<8} {}",
                    r.idx,
                    cmd.kind(),
                    account,
                    cmd.result().retries,
                    detail
                );
            }
            Err(e) => println!("{:<5} <unreadable: {}>", r.idx, e),
        }
    }
    Ok(())
}
