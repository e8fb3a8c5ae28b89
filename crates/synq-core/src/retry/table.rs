//! Kind → policy lookup table, built once at startup.

use std::collections::HashMap;

use crate::command::{CommandKind, Persistence};

use super::policy::RetryBudget;
use super::policy::RetryBudget::{Bounded, Unlimited};
use crate::command::Persistence::{Full, Minimal};
use Surfacing::{Log, Notify};

/// Who hears about a command's final outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surfacing {
    /// Send a completion event to whoever is listening (user-visible).
    Notify,
    /// Log only.
    Log,
}

/// Per-kind execution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindPolicy {
    /// Higher runs first.
    pub priority: i32,
    pub budget: RetryBudget,
    pub persistence: Persistence,
    pub surfacing: Surfacing,
}

const fn policy(
    priority: i32,
    budget: RetryBudget,
    persistence: Persistence,
    surfacing: Surfacing,
) -> KindPolicy {
    KindPolicy {
        priority,
        budget,
        persistence,
        surfacing,
    }
}

/// Built-in policies. Retry budgets can be overridden from config.
pub const DEFAULT_POLICIES: [(CommandKind, KindPolicy); 13] = [
    (CommandKind::Empty, policy(0, Bounded(0), Minimal, Log)),
    (CommandKind::Unknown, policy(0, Bounded(0), Minimal, Log)),
    (CommandKind::AutomaticUpdate, policy(1, Bounded(0), Minimal, Log)),
    (CommandKind::FetchAvatar, policy(3, Bounded(1), Minimal, Log)),
    (CommandKind::FetchTimeline, policy(5, Bounded(2), Minimal, Notify)),
    (CommandKind::FetchUserTimeline, policy(5, Bounded(2), Minimal, Notify)),
    (CommandKind::SearchMessage, policy(6, Bounded(2), Full, Notify)),
    (CommandKind::PutBooleanPreference, policy(7, Bounded(3), Full, Log)),
    (CommandKind::PutLongPreference, policy(7, Bounded(3), Full, Log)),
    (CommandKind::PutStringPreference, policy(7, Bounded(3), Full, Log)),
    (CommandKind::FollowUser, policy(8, Bounded(5), Full, Notify)),
    (CommandKind::StopFollowingUser, policy(8, Bounded(5), Full, Notify)),
    (CommandKind::UpdateStatus, policy(9, Unlimited, Full, Notify)),
];

/// Lookup table shared read-only by the queue manager and store.
#[derive(Debug, Clone)]
pub struct KindTable {
    policies: HashMap<CommandKind, KindPolicy>,
}

impl Default for KindTable {
    fn default() -> Self {
        Self {
            policies: DEFAULT_POLICIES.into_iter().collect(),
        }
    }
}

impl KindTable {
    /// Defaults with the given retry budgets replaced.
    pub fn with_budgets(overrides: &HashMap<CommandKind, RetryBudget>) -> Self {
        let mut table = Self::default();
        for (kind, budget) in overrides {
            if kind.is_sentinel() {
                tracing::warn!(kind = %kind, "ignoring retry budget override for sentinel kind");
                continue;
            }
            if let Some(p) = table.policies.get_mut(kind) {
                p.budget = *budget;
            }
        }
        table
    }

    pub fn policy(&self, kind: CommandKind) -> KindPolicy {
        self.policies
            .get(&kind)
            .copied()
            .unwrap_or(policy(0, Bounded(0), Minimal, Log))
    }

    pub fn priority(&self, kind: CommandKind) -> i32 {
        self.policy(kind).priority
    }

    pub fn budget(&self, kind: CommandKind) -> RetryBudget {
        self.policy(kind).budget
    }

    pub fn persistence(&self, kind: CommandKind) -> Persistence {
        self.policy(kind).persistence
    }
}
