//! Command identity (deduplication fingerprint) and queue ordering key.

use sha2::{Digest, Sha256};
use std::cmp::Reverse;
use std::fmt;

use super::kind::CommandKind;
use super::params::{keys, ParamValue, Parameters};
use super::timeline::TimelineScope;

/// SHA-256 digest over a command's identity-relevant fields.
///
/// Two commands with equal fingerprints are duplicates. The execution result
/// never contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 12 hex chars, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the fingerprint from a command's identity fields.
///
/// Only `status_text` (update-status) and the preference key/value
/// (preference kinds) are mixed in from the parameters. Reply-to and
/// recipient ids are deliberately left out, so two replies with the same
/// text to different messages collide.
pub(crate) fn fingerprint_of(
    kind: CommandKind,
    account_name: &str,
    scope: TimelineScope,
    item_id: i64,
    params: &Parameters,
) -> Fingerprint {
    let mut hasher = Sha256::new();
    put_field(&mut hasher, "kind", kind.as_str());
    if !account_name.is_empty() {
        put_field(&mut hasher, "account", account_name);
    }
    if !scope.is_unknown() {
        put_field(&mut hasher, "scope", scope.as_str());
    }
    if item_id != 0 {
        put_field(&mut hasher, "item", &item_id.to_string());
    }
    match kind {
        CommandKind::UpdateStatus => {
            put_field(
                &mut hasher,
                keys::STATUS_TEXT,
                params.text(keys::STATUS_TEXT).unwrap_or_default(),
            );
        }
        CommandKind::PutBooleanPreference
        | CommandKind::PutLongPreference
        | CommandKind::PutStringPreference => {
            put_field(
                &mut hasher,
                keys::PREFERENCE_KEY,
                params.text(keys::PREFERENCE_KEY).unwrap_or_default(),
            );
            let value = params
                .get(keys::PREFERENCE_VALUE)
                .map(tagged_value)
                .unwrap_or_default();
            put_field(&mut hasher, keys::PREFERENCE_VALUE, &value);
        }
        _ => {}
    }
    Fingerprint(hasher.finalize().into())
}

/// Length-prefixed so adjacent fields can't run together.
fn put_field(hasher: &mut Sha256, name: &str, value: &str) {
    hasher.update(name.as_bytes());
    hasher.update(b"=");
    hasher.update(value.len().to_string().as_bytes());
    hasher.update(b":");
    hasher.update(value.as_bytes());
    hasher.update(b";");
}

fn tagged_value(v: &ParamValue) -> String {
    match v {
        ParamValue::Bool(b) => format!("b:{}", b),
        ParamValue::Long(n) => format!("l:{}", n),
        ParamValue::Text(s) => format!("s:{}", s),
    }
}

/// Total order over live-queue members: higher priority first, then arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueKey {
    priority: Reverse<i32>,
    seq: u64,
}

impl QueueKey {
    pub fn new(priority: i32, seq: u64) -> Self {
        Self {
            priority: Reverse(priority),
            seq,
        }
    }

    pub fn priority(&self) -> i32 {
        self.priority.0
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}
