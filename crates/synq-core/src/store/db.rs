//! SQLite-backed queue store: connection and migrations. Record I/O lives in `records`.

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to one named queue snapshot inside the SQLite store.
///
/// The database file defaults to the XDG state directory:
/// `~/.local/state/synq/queue.db`. Several named stores can share a file.
#[derive(Debug, Clone)]
pub struct QueueStore {
    pub(crate) pool: Pool<Sqlite>,
    pub(crate) store_name: String,
}

impl QueueStore {
    /// Open (or create) the default database and run migrations.
    pub async fn open_default(store_name: &str) -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("synq")?;
        let path = xdg_dirs.place_state_file("queue.db")?;
        Self::open_at(path, store_name).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>, store_name: &str) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&uri)
            .await
            .with_context(|| format!("open queue store: {}", path.display()))?;
        let store = QueueStore {
            pool,
            store_name: store_name.to_string(),
        };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        // One row per persisted command: `idx` is the record's position in
        // the saved queue (0, 1, 2, ...) and `record` its JSON wire form.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_records (
                store TEXT NOT NULL,
                idx INTEGER NOT NULL,
                record TEXT NOT NULL,
                saved_at INTEGER NOT NULL,
                PRIMARY KEY (store, idx)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("migrate queue store")?;

        // At most one process at a time may load and save a given store.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_claims (
                store TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                claimed_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("migrate queue claims")?;

        Ok(())
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
impl QueueStore {
    /// Open an in-memory store for tests (no disk I/O).
    pub(crate) async fn open_memory(store_name: &str) -> Result<Self> {
        // Single connection to avoid in-memory pool handing back a different empty DB.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = QueueStore {
            pool,
            store_name: store_name.to_string(),
        };
        store.migrate().await?;
        Ok(store)
    }
}
