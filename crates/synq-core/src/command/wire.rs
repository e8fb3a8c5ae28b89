//! Wire record codec for persisted and transmitted commands.
//!
//! A record is a flat JSON object. Absent fields take their defaults
//! (`account_name = ""`, `timeline_scope = "unknown"`, `item_id = 0`, zeroed
//! result), and encoding omits default-valued fields. Kind-specific
//! parameters (`status_text`, `preference_key`, ...) sit at the top level.

use serde::{Deserialize, Serialize};

use super::kind::CommandKind;
use super::params::Parameters;
use super::timeline::TimelineScope;
use super::Command;
use crate::result::ExecutionResult;

/// Why a record could not be turned into a command. Callers log and discard.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed command record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unrecognized command kind {0:?}")]
    UnknownKind(String),
}

/// How much of a command survives a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Identity fields, parameters and result.
    Full,
    /// Identity fields and result only; parameters are re-derivable.
    Minimal,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireRecord {
    kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    account_name: String,
    #[serde(default = "unknown_scope", skip_serializing_if = "is_unknown_scope")]
    timeline_scope: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    item_id: i64,
    #[serde(default)]
    result: ExecutionResult,
    #[serde(flatten)]
    parameters: Parameters,
}

fn unknown_scope() -> String {
    TimelineScope::Unknown.as_str().to_string()
}

fn is_unknown_scope(s: &str) -> bool {
    TimelineScope::from_wire(s).is_unknown()
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

impl Command {
    /// Encode the full record.
    pub fn encode(&self) -> serde_json::Result<String> {
        self.encode_for(Persistence::Full)
    }

    /// Encode at the given persistence level.
    pub fn encode_for(&self, level: Persistence) -> serde_json::Result<String> {
        let parameters = match level {
            Persistence::Full => self.parameters.clone(),
            Persistence::Minimal => Parameters::new(),
        };
        let record = WireRecord {
            kind: self.kind.as_str().to_string(),
            account_name: self.account_name.clone(),
            timeline_scope: self.scope.as_str().to_string(),
            item_id: self.item_id,
            result: self.result.clone(),
            parameters,
        };
        serde_json::to_string(&record)
    }

    /// Decode a record. Never panics; an unrecognized kind tag is
    /// [`DecodeError::UnknownKind`], anything structurally wrong is
    /// [`DecodeError::Malformed`].
    pub fn decode(bytes: impl AsRef<[u8]>) -> Result<Command, DecodeError> {
        let record: WireRecord = serde_json::from_slice(bytes.as_ref())?;
        let kind = CommandKind::from_wire(&record.kind);
        if kind == CommandKind::Unknown {
            return Err(DecodeError::UnknownKind(record.kind));
        }
        Command::builder(kind)
            .account(record.account_name)
            .scope(TimelineScope::from_wire(&record.timeline_scope))
            .item_id(record.item_id)
            .parameters(record.parameters)
            .result(record.result)
            .build()
            .map_err(|_| DecodeError::UnknownKind(kind.as_str().to_string()))
    }
}
