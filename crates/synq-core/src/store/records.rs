//! Record I/O: save (drain), load (restore then clear), peek, clear.

use anyhow::{Context, Result};
use sqlx::Row;

use super::db::QueueStore;
use crate::command::{Command, DecodeError};
use crate::queue::{Admission, QueueManager};
use crate::result::unix_timestamp;

/// One persisted row as seen by [`QueueStore::peek`].
#[derive(Debug)]
pub struct StoredRecord {
    pub idx: i64,
    pub saved_at: i64,
    pub decoded: Result<Command, DecodeError>,
}

impl QueueStore {
    /// Drain the live queue into the store, replacing whatever was saved before.
    ///
    /// Returns how many commands were written. On a storage failure the
    /// drained commands are lost; that is logged and 0 is returned.
    pub async fn save(&self, queue: &QueueManager) -> usize {
        let drained = queue.drain();
        if drained.is_empty() {
            // Still clear old rows so a stale snapshot is not restored later.
            if let Err(e) = self.clear().await {
                tracing::error!(store = %self.store_name, error = %e, "failed to clear queue store");
            }
            tracing::debug!(store = %self.store_name, "nothing to save");
            return 0;
        }
        let count = drained.len();
        match self.write_records(queue, &drained).await {
            Ok(()) => {
                tracing::info!(store = %self.store_name, saved = count, "queue saved");
                count
            }
            Err(e) => {
                tracing::error!(
                    store = %self.store_name,
                    lost = count,
                    error = %format!("{:#}", e),
                    "failed to save queue, commands lost"
                );
                0
            }
        }
    }

    async fn write_records(&self, queue: &QueueManager, commands: &[Command]) -> Result<()> {
        let now = unix_timestamp();
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM queue_records WHERE store = ?1")
            .bind(&self.store_name)
            .execute(&mut *tx)
            .await?;
        for (idx, command) in commands.iter().enumerate() {
            let level = queue.table().persistence(command.kind());
            let record = command
                .encode_for(level)
                .with_context(|| format!("encode {}", command))?;
            sqlx::query(
                r#"
                INSERT INTO queue_records (store, idx, record, saved_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(&self.store_name)
            .bind(idx as i64)
            .bind(record)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await.context("commit queue save")?;
        Ok(())
    }

    /// Restore saved commands into the live queue, in saved order, then
    /// delete the saved copy.
    ///
    /// Stops at the first missing index, undecodable record, or refused
    /// admission. Anything after that point is dropped with the rest of the
    /// store. Returns the number of commands restored.
    pub async fn load(&self, queue: &QueueManager) -> usize {
        let mut restored = 0usize;
        let mut idx = 0i64;
        loop {
            let record = match self.read_record(idx).await {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(store = %self.store_name, idx, error = %format!("{:#}", e), "failed to read queue store");
                    break;
                }
            };
            let command = match Command::decode(&record) {
                Ok(command) => command,
                Err(e) => {
                    tracing::error!(store = %self.store_name, idx, error = %e, "undecodable record, restore stopped");
                    break;
                }
            };
            let label = command.to_string();
            match queue.admit(command) {
                Admission::Accepted => restored += 1,
                refused => {
                    tracing::error!(
                        store = %self.store_name,
                        idx,
                        command = %label,
                        admission = ?refused,
                        "restored command refused, restore stopped"
                    );
                    break;
                }
            }
            idx += 1;
        }
        // Restore is destructive: a crash between here and the next save
        // loses the queue.
        if let Err(e) = self.clear().await {
            tracing::error!(store = %self.store_name, error = %format!("{:#}", e), "failed to clear queue store after load");
        }
        tracing::info!(store = %self.store_name, restored, "queue restored");
        restored
    }

    async fn read_record(&self, idx: i64) -> Result<Option<String>> {
        let row = sqlx::query("SELECT record FROM queue_records WHERE store = ?1 AND idx = ?2")
            .bind(&self.store_name)
            .bind(idx)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("record")))
    }

    /// List saved records without touching them.
    pub async fn peek(&self) -> Result<Vec<StoredRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT idx, record, saved_at
            FROM queue_records
            WHERE store = ?1
            ORDER BY idx ASC
            "#,
        )
        .bind(&self.store_name)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let record: String = row.get("record");
            out.push(StoredRecord {
                idx: row.get("idx"),
                saved_at: row.get("saved_at"),
                decoded: Command::decode(&record),
            });
        }
        Ok(out)
    }

    /// Delete every saved record of this store. Returns the number removed.
    pub async fn clear(&self) -> Result<u64> {
        let done = sqlx::query("DELETE FROM queue_records WHERE store = ?1")
            .bind(&self.store_name)
            .execute(&self.pool)
            .await
            .context("clear queue store")?;
        Ok(done.rows_affected())
    }

    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, idx: i64, record: &str) -> Result<()> {
        sqlx::query("INSERT INTO queue_records (store, idx, record, saved_at) VALUES (?1, ?2, ?3, 0)")
            .bind(&self.store_name)
            .bind(idx)
            .bind(record)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
