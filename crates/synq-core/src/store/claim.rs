//! Exclusive claims on a named store.
//!
//! `save` replaces the whole store, so two processes that each load, work
//! and save would overwrite each other's commands. A claim row keeps one
//! owner at a time; everyone else is refused with [`StoreBusy`].

use anyhow::Result;
use sqlx::Row;
use std::sync::atomic::{AtomicU64, Ordering};

use super::db::QueueStore;
use crate::result::unix_timestamp;

static NEXT_CLAIM: AtomicU64 = AtomicU64::new(0);

/// The store is claimed by someone else.
#[derive(Debug, thiserror::Error)]
#[error("queue store {store:?} is in use by {owner} (since unix time {since})")]
pub struct StoreBusy {
    pub store: String,
    pub owner: String,
    pub since: i64,
}

/// Held while a process owns the store. Call [`StoreClaim::release`] when done;
/// a claim left behind by a crashed process is removed with
/// [`QueueStore::break_claim`].
#[derive(Debug)]
#[must_use = "a claim must be released"]
pub struct StoreClaim {
    store: QueueStore,
    owner: String,
}

impl StoreClaim {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub async fn release(self) -> Result<()> {
        sqlx::query("DELETE FROM queue_claims WHERE store = ?1 AND owner = ?2")
            .bind(&self.store.store_name)
            .bind(&self.owner)
            .execute(&self.store.pool)
            .await?;
        tracing::debug!(store = %self.store.store_name, owner = %self.owner, "store claim released");
        Ok(())
    }
}

impl QueueStore {
    /// Take the exclusive claim on this store. Fails with [`StoreBusy`]
    /// (inside the `anyhow::Error`) when another owner holds it.
    pub async fn claim(&self) -> Result<StoreClaim> {
        let owner = format!(
            "pid {} claim {}",
            std::process::id(),
            NEXT_CLAIM.fetch_add(1, Ordering::Relaxed)
        );
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO queue_claims (store, owner, claimed_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&self.store_name)
        .bind(&owner)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            let row = sqlx::query("SELECT owner, claimed_at FROM queue_claims WHERE store = ?1")
                .bind(&self.store_name)
                .fetch_optional(&self.pool)
                .await?;
            let (owner, since) = match row {
                Some(row) => (row.get("owner"), row.get("claimed_at")),
                None => ("an unknown owner".to_string(), 0),
            };
            return Err(StoreBusy {
                store: self.store_name.clone(),
                owner,
                since,
            }
            .into());
        }
        tracing::debug!(store = %self.store_name, owner = %owner, "store claimed");
        Ok(StoreClaim {
            store: self.clone(),
            owner,
        })
    }

    /// Remove any claim on this store, e.g. one left by a crashed process.
    /// Returns whether a claim was removed.
    pub async fn break_claim(&self) -> Result<bool> {
        let done = sqlx::query("DELETE FROM queue_claims WHERE store = ?1")
            .bind(&self.store_name)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() > 0 {
            tracing::warn!(store = %self.store_name, "stale store claim removed");
        }
        Ok(done.rows_affected() > 0)
    }
}
