//! Shared context passed explicitly to the queue, store and connectors.
//!
//! Built once with [`SyncContext::initialize`] and closed with
//! [`SyncContext::teardown`]; nothing is looked up through globals.

use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::command::Command;
use crate::config::{AccountConfig, SynqConfig};
use crate::connector::Origin;
use crate::queue::{Admission, CommandEvent, QueueManager};
use crate::retry::{KindTable, RetryPolicy};
use crate::store::QueueStore;

/// Errors building the context.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("duplicate account name {0:?}")]
    DuplicateAccount(String),
    #[error("account name must not be empty")]
    EmptyAccountName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub origin: Origin,
}

/// Configured accounts by unique name.
#[derive(Debug, Clone, Default)]
pub struct Accounts {
    by_name: BTreeMap<String, Account>,
}

impl Accounts {
    pub fn from_config(accounts: &[AccountConfig]) -> Result<Self, ContextError> {
        let mut by_name = BTreeMap::new();
        for a in accounts {
            if a.name.is_empty() {
                return Err(ContextError::EmptyAccountName);
            }
            let account = Account {
                name: a.name.clone(),
                origin: a.origin,
            };
            if by_name.insert(a.name.clone(), account).is_some() {
                return Err(ContextError::DuplicateAccount(a.name.clone()));
            }
        }
        Ok(Self { by_name })
    }

    /// `None` if no account exists with the given name.
    pub fn get(&self, name: &str) -> Option<&Account> {
        self.by_name.get(name)
    }

    /// All accounts, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Everything the sync service needs, constructed up front.
pub struct SyncContext {
    config: SynqConfig,
    table: Arc<KindTable>,
    accounts: Arc<Accounts>,
    store: QueueStore,
}

impl SyncContext {
    /// Open the queue store (config path or XDG default) and build lookup tables.
    pub async fn initialize(config: SynqConfig) -> Result<Self> {
        let store = match &config.database_path {
            Some(path) => QueueStore::open_at(path, &config.store_name).await?,
            None => QueueStore::open_default(&config.store_name).await?,
        };
        Self::with_store(config, store)
    }

    /// Build a context around an already opened store.
    pub fn with_store(config: SynqConfig, store: QueueStore) -> Result<Self> {
        let table = Arc::new(config.kind_table()?);
        let accounts = Arc::new(Accounts::from_config(&config.accounts)?);
        tracing::debug!(
            accounts = accounts.len(),
            store = store.store_name(),
            "sync context initialized"
        );
        Ok(Self {
            config,
            table,
            accounts,
            store,
        })
    }

    pub fn config(&self) -> &SynqConfig {
        &self.config
    }

    pub fn kind_table(&self) -> Arc<KindTable> {
        Arc::clone(&self.table)
    }

    pub fn accounts(&self) -> Arc<Accounts> {
        Arc::clone(&self.accounts)
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.config.retry.policy()
    }

    /// A fresh, empty live queue configured from this context.
    pub fn new_queue(
        &self,
        events: Option<tokio::sync::mpsc::UnboundedSender<CommandEvent>>,
    ) -> QueueManager {
        let queue = QueueManager::new(self.kind_table())
            .with_capacity(self.config.max_queue_len)
            .with_retry_policy(self.retry_policy());
        match events {
            Some(tx) => queue.with_events(tx),
            None => queue,
        }
    }

    /// Add one command to the persisted queue without running it.
    ///
    /// Claims the store for the load/admit/save cycle, so this fails with
    /// [`crate::store::StoreBusy`] while a service owns the queue. Returns
    /// the admission outcome and how many commands are now saved.
    pub async fn enqueue_stored(&self, command: Command) -> Result<(Admission, usize)> {
        let claim = self.store.claim().await?;
        let queue = self.new_queue(None);
        let restored = self.store.load(&queue).await;
        tracing::debug!(restored, "queue restored for enqueue");

        let admission = queue.admit(command);
        let expected = queue.len();
        let saved = self.store.save(&queue).await;
        claim.release().await?;
        if saved != expected {
            anyhow::bail!("saved {} of {} queued commands", saved, expected);
        }
        Ok((admission, saved))
    }

    /// Close the store. Call after the last save.
    pub async fn teardown(self) {
        self.store.close().await;
        tracing::debug!("sync context torn down");
    }
}
