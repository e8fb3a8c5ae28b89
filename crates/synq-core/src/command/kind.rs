//! Command kinds and their stable wire names.

use std::fmt;

/// Closed set of operations a queued command can represent.
///
/// Per-kind behaviour (priority, retry budget, persistence) lives in
/// [`crate::retry::KindTable`], not on the enum itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    /// No-op placeholder; never admitted to the live queue.
    Empty,
    /// Failed to decode; never executed.
    Unknown,
    AutomaticUpdate,
    FetchTimeline,
    FetchUserTimeline,
    FetchAvatar,
    UpdateStatus,
    FollowUser,
    StopFollowingUser,
    SearchMessage,
    PutBooleanPreference,
    PutLongPreference,
    PutStringPreference,
}

impl CommandKind {
    /// Every variant, sentinels included.
    pub const ALL: [CommandKind; 13] = [
        CommandKind::Empty,
        CommandKind::Unknown,
        CommandKind::AutomaticUpdate,
        CommandKind::FetchTimeline,
        CommandKind::FetchUserTimeline,
        CommandKind::FetchAvatar,
        CommandKind::UpdateStatus,
        CommandKind::FollowUser,
        CommandKind::StopFollowingUser,
        CommandKind::SearchMessage,
        CommandKind::PutBooleanPreference,
        CommandKind::PutLongPreference,
        CommandKind::PutStringPreference,
    ];

    /// Stable tag used in persisted and transmitted records.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Empty => "empty",
            CommandKind::Unknown => "unknown",
            CommandKind::AutomaticUpdate => "automatic-update",
            CommandKind::FetchTimeline => "fetch-timeline",
            CommandKind::FetchUserTimeline => "fetch-user-timeline",
            CommandKind::FetchAvatar => "fetch-avatar",
            CommandKind::UpdateStatus => "update-status",
            CommandKind::FollowUser => "follow-user",
            CommandKind::StopFollowingUser => "stop-following-user",
            CommandKind::SearchMessage => "search-message",
            CommandKind::PutBooleanPreference => "put-boolean-preference",
            CommandKind::PutLongPreference => "put-long-preference",
            CommandKind::PutStringPreference => "put-string-preference",
        }
    }

    /// Parse a wire tag. Anything unrecognized maps to `Unknown`.
    pub fn from_wire(s: &str) -> Self {
        CommandKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .unwrap_or(CommandKind::Unknown)
    }

    /// Sentinels are never placed in the live queue.
    pub fn is_sentinel(self) -> bool {
        matches!(self, CommandKind::Empty | CommandKind::Unknown)
    }

    /// Kinds that apply to every account when no account name is given.
    pub fn is_account_agnostic(self) -> bool {
        matches!(self, CommandKind::AutomaticUpdate | CommandKind::Empty)
    }

    /// Kinds whose `item_id` names a user rather than a message.
    pub fn targets_user(self) -> bool {
        matches!(
            self,
            CommandKind::FetchUserTimeline | CommandKind::FollowUser | CommandKind::StopFollowingUser
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_roundtrip() {
        for kind in CommandKind::ALL {
            assert_eq!(CommandKind::from_wire(kind.as_str()), kind);
        }
    }

    #[test]
    fn unrecognized_tag_is_unknown() {
        assert_eq!(CommandKind::from_wire("reblog"), CommandKind::Unknown);
        assert_eq!(CommandKind::from_wire(""), CommandKind::Unknown);
        assert_eq!(CommandKind::from_wire("UPDATE-STATUS"), CommandKind::Unknown);
    }

    #[test]
    fn user_targeted_kinds() {
        assert!(CommandKind::FollowUser.targets_user());
        assert!(CommandKind::FetchUserTimeline.targets_user());
        assert!(!CommandKind::UpdateStatus.targets_user());
    }
}
