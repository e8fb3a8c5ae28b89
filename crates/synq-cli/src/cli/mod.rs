//! CLI for the synq command queue.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use synq_core::command::{Command, TimelineScope};
use synq_core::config;
use synq_core::context::SyncContext;

use commands::{
    preference_command, run_clear, run_enqueue, run_service, run_status, run_unlock,
};

/// Top-level CLI for the synq command queue.
#[derive(Debug, Parser)]
#[command(name = "synq")]
#[command(about = "synq: durable command queue for social network sync", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Value type of a preference written with `synq pref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PrefType {
    Bool,
    Long,
    String,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue a status update (post or reply).
    Post {
        /// Account to post from.
        #[arg(long)]
        account: String,
        /// Message id this post replies to.
        #[arg(long, value_name = "ID")]
        reply_to: Option<i64>,
        /// User id of a direct message recipient.
        #[arg(long, value_name = "ID")]
        recipient: Option<i64>,
        /// Status text.
        text: String,
    },

    /// Queue a message search.
    Search {
        #[arg(long)]
        account: String,
        query: String,
    },

    /// Queue a follow request.
    Follow {
        #[arg(long)]
        account: String,
        user_id: i64,
    },

    /// Queue an unfollow request.
    Unfollow {
        #[arg(long)]
        account: String,
        user_id: i64,
    },

    /// Queue a timeline fetch.
    Fetch {
        #[arg(long)]
        account: String,
        /// Timeline to fetch: home, mentions, direct, favorites, public, ...
        #[arg(long, default_value = "home", value_parser = parse_timeline)]
        timeline: TimelineScope,
    },

    /// Queue a fetch of one user's timeline.
    FetchUser {
        #[arg(long)]
        account: String,
        user_id: i64,
    },

    /// Queue a preference write.
    Pref {
        key: String,
        value: String,
        #[arg(long = "type", value_enum, default_value = "string")]
        pref_type: PrefType,
        /// Account the preference belongs to (global if omitted).
        #[arg(long, default_value = "")]
        account: String,
    },

    /// Show the persisted queue.
    Status,

    /// Drop every persisted command.
    Clear,

    /// Release the queue after `synq run` exited without shutting down.
    Unlock,

    /// Restore the queue and work on it until Ctrl-C, then save what is left.
    Run {
        /// Stop once nothing is pending or executing.
        #[arg(long)]
        until_idle: bool,
    },
}

fn parse_timeline(s: &str) -> Result<TimelineScope, String> {
    let scope = TimelineScope::from_wire(s);
    if scope.is_unknown() {
        return Err(format!("unknown timeline {:?}", s));
    }
    Ok(scope)
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let ctx = Arc::new(SyncContext::initialize(cfg).await?);

        let result = match cli.command {
            CliCommand::Post {
                account,
                reply_to,
                recipient,
                text,
            } => {
                let command = Command::post_status(
                    account,
                    text,
                    reply_to.unwrap_or(0),
                    recipient.unwrap_or(0),
                );
                run_enqueue(&ctx, command).await
            }
            CliCommand::Search { account, query } => {
                run_enqueue(&ctx, Command::search(account, query)).await
            }
            CliCommand::Follow { account, user_id } => {
                run_enqueue(&ctx, Command::follow_user(account, user_id)).await
            }
            CliCommand::Unfollow { account, user_id } => {
                run_enqueue(&ctx, Command::stop_following_user(account, user_id)).await
            }
            CliCommand::Fetch { account, timeline } => {
                run_enqueue(&ctx, Command::fetch_timeline(account, timeline)).await
            }
            CliCommand::FetchUser { account, user_id } => {
                run_enqueue(&ctx, Command::fetch_user_timeline(account, user_id)).await
            }
            CliCommand::Pref {
                key,
                value,
                pref_type,
                account,
            } => match preference_command(&account, &key, &value, pref_type) {
                Ok(command) => run_enqueue(&ctx, command).await,
                Err(e) => Err(e),
            },
            CliCommand::Status => run_status(&ctx).await,
            CliCommand::Clear => run_clear(&ctx).await,
            CliCommand::Unlock => run_unlock(&ctx).await,
            CliCommand::Run { until_idle } => run_service(Arc::clone(&ctx), until_idle).await,
        };

        match Arc::try_unwrap(ctx) {
            Ok(ctx) => ctx.teardown().await,
            Err(ctx) => ctx.store().close().await,
        }
        result
    }
}

#[cfg(test)]
mod tests;
