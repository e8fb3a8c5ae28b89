//! Origin → connector lookup, resolving each command's account.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::{Connector, Origin};
use crate::command::Command;
use crate::context::Accounts;
use crate::retry::{Executed, ExecutionFailure};

/// Dispatches commands to the connector registered for their account's origin.
///
/// Commands without an account name fan out to every configured account.
pub struct ConnectorRegistry {
    accounts: Arc<Accounts>,
    connectors: HashMap<Origin, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new(accounts: Arc<Accounts>) -> Self {
        Self {
            accounts,
            connectors: HashMap::new(),
        }
    }

    /// Register (or replace) the connector for an origin.
    pub fn register(mut self, origin: Origin, connector: Arc<dyn Connector>) -> Self {
        self.connectors.insert(origin, connector);
        self
    }

    /// Register the same connector for every origin.
    pub fn register_all(mut self, connector: Arc<dyn Connector>) -> Self {
        for origin in [Origin::Twitter, Origin::PumpIo, Origin::StatusNet] {
            self.connectors.insert(origin, Arc::clone(&connector));
        }
        self
    }

    async fn execute_for_account(
        &self,
        account_name: &str,
        command: &Command,
    ) -> Result<Executed, ExecutionFailure> {
        let Some(account) = self.accounts.get(account_name) else {
            return Err(ExecutionFailure::permanent(format!(
                "no account named {:?}",
                account_name
            )));
        };
        let Some(connector) = self.connectors.get(&account.origin) else {
            return Err(ExecutionFailure::permanent(format!(
                "no connector for origin {}",
                account.origin
            )));
        };
        connector.execute(command).await
    }

    async fn execute_for_all(&self, command: &Command) -> Result<Executed, ExecutionFailure> {
        if self.accounts.is_empty() {
            tracing::debug!(command = %command, "no accounts configured, nothing to do");
            return Ok(Executed::default());
        }
        let mut total = 0u64;
        let mut failures: Vec<ExecutionFailure> = Vec::new();
        for account in self.accounts.iter() {
            let per_account = command.with_account(account.name.clone());
            match self.execute_for_account(&account.name, &per_account).await {
                Ok(done) => total += done.items_downloaded,
                Err(e) => {
                    tracing::debug!(account = %account.name, error = %e, "account sync failed");
                    failures.push(ExecutionFailure {
                        message: format!("{}: {}", account.name, e.message),
                        retriable: e.retriable,
                    });
                }
            }
        }
        if failures.is_empty() {
            return Ok(Executed::items(total));
        }
        let retriable = failures.iter().all(|f| f.retriable);
        let message = failures
            .into_iter()
            .map(|f| f.message)
            .collect::<Vec<_>>()
            .join("; ");
        Err(ExecutionFailure { message, retriable })
    }
}

#[async_trait]
impl Connector for ConnectorRegistry {
    async fn execute(&self, command: &Command) -> Result<Executed, ExecutionFailure> {
        if command.account_name().is_empty() {
            self.execute_for_all(command).await
        } else {
            self.execute_for_account(command.account_name(), command).await
        }
    }
}
