//! The boundary to per-network protocol connectors.
//!
//! The queue hands a dequeued [`Command`] to a [`Connector`] and only looks
//! at whether the outcome is a success or a (retriable or permanent)
//! failure. Protocol clients live outside this crate.

mod registry;

pub use registry::ConnectorRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::command::Command;
use crate::retry::{Executed, ExecutionFailure};

/// Which kind of network an account lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Twitter,
    #[serde(rename = "pumpio")]
    PumpIo,
    StatusNet,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Twitter => "twitter",
            Origin::PumpIo => "pumpio",
            Origin::StatusNet => "statusnet",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executes one command against a remote service. May block on network I/O;
/// it is always called without the queue lock held.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn execute(&self, command: &Command) -> Result<Executed, ExecutionFailure>;
}

/// Connector that does nothing and reports success with zero items.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConnector;

#[async_trait]
impl Connector for NullConnector {
    async fn execute(&self, command: &Command) -> Result<Executed, ExecutionFailure> {
        tracing::debug!(command = %command, "null connector: nothing to do");
        Ok(Executed::default())
    }
}
