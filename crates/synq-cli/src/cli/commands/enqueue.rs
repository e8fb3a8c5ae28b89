//! `synq post|search|follow|...` – add one command to the persisted queue.

use anyhow::{Context, Result};
use synq_core::command::Command;
use synq_core::context::SyncContext;
use synq_core::queue::Admission;
use synq_core::store::StoreBusy;

use crate::cli::PrefType;

/// Add `command` to the persisted queue. Refused while `synq run` owns it.
pub async fn run_enqueue(ctx: &SyncContext, command: Command) -> Result<()> {
    let label = command.to_string();
    let (admission, saved) = ctx.enqueue_stored(command).await.map_err(|e| {
        if e.downcast_ref::<StoreBusy>().is_some() {
            e.context("the queue is in use; stop `synq run` first, or use `synq unlock` if it crashed")
        } else {
            e
        }
    })?;

    match admission {
        Admission::Accepted => println!("Queued {} ({} pending).", label, saved),
        Admission::Duplicate => println!("Already queued: {}", label),
        Admission::Full => anyhow::bail!("queue is full ({} pending)", saved),
        Admission::Sentinel => anyhow::bail!("refusing to queue {}", label),
    }
    Ok(())
}

/// Build a preference command from its CLI string value.
pub fn preference_command(
    account: &str,
    key: &str,
    value: &str,
    pref_type: PrefType,
) -> Result<Command> {
    let command = match pref_type {
        PrefType::Bool => {
            let v: bool = value
                .parse()
                .with_context(|| format!("expected true or false, got {:?}", value))?;
            Command::put_boolean_preference(account, key, v)
        }
        PrefType::Long => {
            let v: i64 = value
                .parse()
                .with_context(|| format!("expected an integer, got {:?}", value))?;
            Command::put_long_preference(account, key, v)
        }
        PrefType::String => Command::put_string_preference(account, key, value),
    };
    Ok(command)
}
