//! Queued commands: one pending network or preference operation each.
//!
//! A [`Command`] is immutable after construction apart from its
//! [`ExecutionResult`], and caches its [`Fingerprint`] when built.

mod identity;
mod kind;
mod params;
mod timeline;
mod wire;

pub use identity::{Fingerprint, QueueKey};
pub use kind::CommandKind;
pub use params::{keys, ParamValue, Parameters};
pub use timeline::TimelineScope;
pub use wire::{DecodeError, Persistence};

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::result::ExecutionResult;

/// Construction errors.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// One unit of queued work.
///
/// `item_id` is a message id for most kinds and a user id for
/// [`CommandKind::targets_user`] kinds.
///
/// Equality and hashing go through the fingerprint, so two commands that
/// differ only in their results are equal.
#[derive(Debug, Clone)]
pub struct Command {
    kind: CommandKind,
    account_name: String,
    scope: TimelineScope,
    item_id: i64,
    parameters: Parameters,
    result: ExecutionResult,
    fingerprint: Fingerprint,
}

impl Command {
    /// Build a command. Fails for `CommandKind::Unknown`.
    pub fn new(
        kind: CommandKind,
        account_name: impl Into<String>,
        scope: TimelineScope,
        item_id: i64,
        parameters: Parameters,
    ) -> Result<Self, CommandError> {
        Command::builder(kind)
            .account(account_name)
            .scope(scope)
            .item_id(item_id)
            .parameters(parameters)
            .build()
    }

    pub fn builder(kind: CommandKind) -> CommandBuilder {
        CommandBuilder {
            kind,
            account_name: String::new(),
            scope: TimelineScope::Unknown,
            item_id: 0,
            parameters: Parameters::new(),
            result: None,
        }
    }

    /// The no-op placeholder.
    pub fn empty() -> Self {
        Command::assemble(
            CommandKind::Empty,
            String::new(),
            TimelineScope::Unknown,
            0,
            Parameters::new(),
            None,
        )
    }

    /// Search public messages for `query`.
    pub fn search(account_name: impl Into<String>, query: impl Into<String>) -> Self {
        let mut params = Parameters::new();
        params.insert(keys::SEARCH_QUERY, query.into());
        Command::assemble(
            CommandKind::SearchMessage,
            account_name.into(),
            TimelineScope::Public,
            0,
            params,
            None,
        )
    }

    /// Post a status. Zero reply/recipient ids mean "none" and are not stored.
    pub fn post_status(
        account_name: impl Into<String>,
        text: impl Into<String>,
        reply_to_id: i64,
        recipient_id: i64,
    ) -> Self {
        let mut params = Parameters::new();
        params.insert(keys::STATUS_TEXT, text.into());
        if reply_to_id != 0 {
            params.insert(keys::REPLY_TO_ID, reply_to_id);
        }
        if recipient_id != 0 {
            params.insert(keys::RECIPIENT_ID, recipient_id);
        }
        Command::assemble(
            CommandKind::UpdateStatus,
            account_name.into(),
            TimelineScope::Unknown,
            0,
            params,
            None,
        )
    }

    pub fn fetch_timeline(account_name: impl Into<String>, scope: TimelineScope) -> Self {
        Command::assemble(
            CommandKind::FetchTimeline,
            account_name.into(),
            scope,
            0,
            Parameters::new(),
            None,
        )
    }

    pub fn fetch_user_timeline(account_name: impl Into<String>, user_id: i64) -> Self {
        Command::assemble(
            CommandKind::FetchUserTimeline,
            account_name.into(),
            TimelineScope::User,
            user_id,
            Parameters::new(),
            None,
        )
    }

    pub fn fetch_avatar(account_name: impl Into<String>, user_id: i64) -> Self {
        Command::assemble(
            CommandKind::FetchAvatar,
            account_name.into(),
            TimelineScope::Unknown,
            user_id,
            Parameters::new(),
            None,
        )
    }

    pub fn follow_user(account_name: impl Into<String>, user_id: i64) -> Self {
        Command::assemble(
            CommandKind::FollowUser,
            account_name.into(),
            TimelineScope::Unknown,
            user_id,
            Parameters::new(),
            None,
        )
    }

    pub fn stop_following_user(account_name: impl Into<String>, user_id: i64) -> Self {
        Command::assemble(
            CommandKind::StopFollowingUser,
            account_name.into(),
            TimelineScope::Unknown,
            user_id,
            Parameters::new(),
            None,
        )
    }

    /// Periodic sync across all accounts.
    pub fn automatic_update() -> Self {
        Command::assemble(
            CommandKind::AutomaticUpdate,
            String::new(),
            TimelineScope::All,
            0,
            Parameters::new(),
            None,
        )
    }

    pub fn put_boolean_preference(
        account_name: impl Into<String>,
        key: impl Into<String>,
        value: bool,
    ) -> Self {
        Command::preference(CommandKind::PutBooleanPreference, account_name.into(), key.into(), value.into())
    }

    pub fn put_long_preference(
        account_name: impl Into<String>,
        key: impl Into<String>,
        value: i64,
    ) -> Self {
        Command::preference(CommandKind::PutLongPreference, account_name.into(), key.into(), value.into())
    }

    pub fn put_string_preference(
        account_name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Command::preference(
            CommandKind::PutStringPreference,
            account_name.into(),
            key.into(),
            ParamValue::Text(value.into()),
        )
    }

    fn preference(kind: CommandKind, account_name: String, key: String, value: ParamValue) -> Self {
        let mut params = Parameters::new();
        params.insert(keys::PREFERENCE_KEY, key);
        params.insert(keys::PREFERENCE_VALUE, value);
        Command::assemble(kind, account_name, TimelineScope::Unknown, 0, params, None)
    }

    /// Single construction path. A `None` result starts a fresh retry count.
    fn assemble(
        kind: CommandKind,
        account_name: String,
        scope: TimelineScope,
        item_id: i64,
        parameters: Parameters,
        result: Option<ExecutionResult>,
    ) -> Self {
        let fingerprint = identity::fingerprint_of(kind, &account_name, scope, item_id, &parameters);
        let result = result.unwrap_or_else(|| {
            let mut fresh = ExecutionResult::default();
            fresh.reset_retries();
            fresh
        });
        Command {
            kind,
            account_name,
            scope,
            item_id,
            parameters,
            result,
            fingerprint,
        }
    }

    /// Same command addressed to one account, keeping its result. Used to fan
    /// an account-agnostic command out over every account.
    pub fn with_account(&self, account_name: impl Into<String>) -> Command {
        Command::assemble(
            self.kind,
            account_name.into(),
            self.scope,
            self.item_id,
            self.parameters.clone(),
            Some(self.result.clone()),
        )
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Empty when the command applies to all accounts.
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn timeline_scope(&self) -> TimelineScope {
        self.scope
    }

    pub fn item_id(&self) -> i64 {
        self.item_id
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn result(&self) -> &ExecutionResult {
        &self.result
    }

    pub fn result_mut(&mut self) -> &mut ExecutionResult {
        &mut self.result
    }

    pub fn status_text(&self) -> Option<&str> {
        self.parameters.text(keys::STATUS_TEXT)
    }

    pub fn search_query(&self) -> Option<&str> {
        self.parameters.text(keys::SEARCH_QUERY)
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

impl Eq for Command {}

impl Hash for Command {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint.hash(state);
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command:{}", self.kind)?;
        if !self.account_name.is_empty() {
            write!(f, ",account:{}", self.account_name)?;
        }
        if !self.scope.is_unknown() {
            write!(f, ",{}", self.scope)?;
        }
        if self.item_id != 0 {
            write!(f, ",id:{}", self.item_id)?;
        }
        write!(f, ",fp:{},{}", self.fingerprint.short(), self.result)
    }
}

/// Step-by-step construction for commands without a dedicated constructor.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    kind: CommandKind,
    account_name: String,
    scope: TimelineScope,
    item_id: i64,
    parameters: Parameters,
    result: Option<ExecutionResult>,
}

impl CommandBuilder {
    pub fn account(mut self, account_name: impl Into<String>) -> Self {
        self.account_name = account_name.into();
        self
    }

    pub fn scope(mut self, scope: TimelineScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn item_id(mut self, item_id: i64) -> Self {
        self.item_id = item_id;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(key, value);
        self
    }

    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Carry over an existing result (restore path).
    pub(crate) fn result(mut self, result: ExecutionResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn build(self) -> Result<Command, CommandError> {
        if self.kind == CommandKind::Unknown {
            return Err(CommandError::InvalidArgument(
                "command kind must not be unknown".to_string(),
            ));
        }
        Ok(Command::assemble(
            self.kind,
            self.account_name,
            self.scope,
            self.item_id,
            self.parameters,
            self.result,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_is_rejected() {
        let err = Command::new(
            CommandKind::Unknown,
            "alice",
            TimelineScope::Home,
            0,
            Parameters::new(),
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument(_)));
    }

    #[test]
    fn fresh_command_has_zero_result() {
        let cmd = Command::fetch_timeline("alice", TimelineScope::Home);
        assert_eq!(cmd.result(), &ExecutionResult::default());
    }

    #[test]
    fn post_status_skips_zero_ids() {
        let cmd = Command::post_status("alice", "hello", 0, 0);
        assert_eq!(cmd.kind(), CommandKind::UpdateStatus);
        assert_eq!(cmd.status_text(), Some("hello"));
        assert!(cmd.parameters().get(keys::REPLY_TO_ID).is_none());
        assert!(cmd.parameters().get(keys::RECIPIENT_ID).is_none());

        let reply = Command::post_status("alice", "hello", 12, 34);
        assert_eq!(reply.parameters().long(keys::REPLY_TO_ID), Some(12));
        assert_eq!(reply.parameters().long(keys::RECIPIENT_ID), Some(34));
    }

    #[test]
    fn search_pins_public_scope() {
        let cmd = Command::search("alice", "rustlang");
        assert_eq!(cmd.kind(), CommandKind::SearchMessage);
        assert_eq!(cmd.timeline_scope(), TimelineScope::Public);
        assert_eq!(cmd.search_query(), Some("rustlang"));
    }

    #[test]
    fn fingerprint_ignores_result() {
        let a = Command::fetch_timeline("alice", TimelineScope::Mentions);
        let mut b = Command::fetch_timeline("alice", TimelineScope::Mentions);
        b.result_mut().record_failure("timeout");
        b.result_mut().record_success(10);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a, b);
    }

    #[test]
    fn replies_with_same_text_collide() {
        let a = Command::post_status("alice", "+1", 100, 0);
        let b = Command::post_status("alice", "+1", 200, 7);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = Command::post_status("alice", "-1", 100, 0);
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn preference_fingerprint_includes_key_and_value() {
        let a = Command::put_long_preference("", "fetch_period", 15);
        let b = Command::put_long_preference("", "fetch_period", 30);
        let c = Command::put_long_preference("", "fetch_period", 15);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn builder_matches_constructor() {
        let built = Command::builder(CommandKind::FollowUser)
            .account("alice")
            .item_id(42)
            .build()
            .unwrap();
        assert_eq!(built.fingerprint(), Command::follow_user("alice", 42).fingerprint());
    }

    #[test]
    fn display_is_compact() {
        let cmd = Command::fetch_user_timeline("alice", 9);
        let s = cmd.to_string();
        assert!(s.starts_with("command:fetch-user-timeline,account:alice,user,id:9,fp:"));
        assert!(s.ends_with("retries:0"));
    }
}
