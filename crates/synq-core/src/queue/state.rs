//! Lock-protected queue contents. All methods assume the caller holds the lock.

use std::collections::{BTreeMap, HashMap};

use tokio::time::Instant;

use crate::command::{Command, Fingerprint, QueueKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pending(QueueKey),
    Executing(QueueKey),
}

/// A pending command and the earliest time it may run again (set after a
/// retriable failure).
#[derive(Debug)]
struct Pending {
    command: Command,
    not_before: Option<Instant>,
}

impl Pending {
    fn is_due(&self, now: Instant) -> bool {
        self.not_before.map_or(true, |t| t <= now)
    }
}

/// Pending commands in queue order, plus a fingerprint index covering both
/// pending and executing commands.
#[derive(Debug, Default)]
pub(super) struct QueueState {
    pending: BTreeMap<QueueKey, Pending>,
    members: HashMap<Fingerprint, Slot>,
    next_seq: u64,
}

impl QueueState {
    pub(super) fn contains(&self, fp: &Fingerprint) -> bool {
        self.members.contains_key(fp)
    }

    pub(super) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pending plus executing.
    pub(super) fn member_count(&self) -> usize {
        self.members.len()
    }

    pub(super) fn executing_len(&self) -> usize {
        self.members.len() - self.pending.len()
    }

    /// Insert a command not yet in the queue; assigns the next arrival number.
    pub(super) fn insert_new(&mut self, priority: i32, command: Command) -> QueueKey {
        let key = QueueKey::new(priority, self.next_seq);
        self.next_seq += 1;
        self.members.insert(command.fingerprint(), Slot::Pending(key));
        self.pending.insert(
            key,
            Pending {
                command,
                not_before: None,
            },
        );
        key
    }

    /// Move the highest-ordered command that is due at `now` to executing.
    /// Commands still backing off are skipped, not blocking the ones behind them.
    pub(super) fn pop_next(&mut self, now: Instant) -> Option<(QueueKey, Command)> {
        let key = self
            .pending
            .iter()
            .find(|(_, p)| p.is_due(now))
            .map(|(key, _)| *key)?;
        let Pending { command, .. } = self.pending.remove(&key)?;
        self.members.insert(command.fingerprint(), Slot::Executing(key));
        Some((key, command))
    }

    /// Earliest time a backing-off command becomes due, if nothing is due now.
    pub(super) fn next_due(&self) -> Option<Instant> {
        self.pending.values().filter_map(|p| p.not_before).min()
    }

    /// Drop an executing command for good. Returns its key if it was executing.
    pub(super) fn finish(&mut self, fp: &Fingerprint) -> Option<QueueKey> {
        match self.members.get(fp).copied() {
            Some(Slot::Executing(key)) => {
                self.members.remove(fp);
                Some(key)
            }
            _ => None,
        }
    }

    /// Put an executing command back at its original position, not to run
    /// before `not_before`.
    ///
    /// Returns false (and drops the command) when it was not executing and an
    /// equal command has since been admitted.
    pub(super) fn requeue(&mut self, priority: i32, command: Command, not_before: Instant) -> bool {
        let fp = command.fingerprint();
        let key = match self.members.get(&fp).copied() {
            Some(Slot::Executing(key)) => key,
            Some(Slot::Pending(_)) => return false,
            None => {
                let key = QueueKey::new(priority, self.next_seq);
                self.next_seq += 1;
                key
            }
        };
        self.members.insert(fp, Slot::Pending(key));
        self.pending.insert(
            key,
            Pending {
                command,
                not_before: Some(not_before),
            },
        );
        true
    }

    /// Remove every pending command, in queue order. Executing commands stay tracked.
    pub(super) fn drain(&mut self) -> Vec<Command> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_values()
            .map(|p| {
                self.members.remove(&p.command.fingerprint());
                p.command
            })
            .collect()
    }

    pub(super) fn snapshot(&self) -> Vec<Command> {
        self.pending.values().map(|p| p.command.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::TimelineScope;

    use std::time::Duration;

    fn fetch(account: &str) -> Command {
        Command::fetch_timeline(account, TimelineScope::Home)
    }

    #[test]
    fn pop_moves_to_executing_and_keeps_membership() {
        let mut s = QueueState::default();
        s.insert_new(5, fetch("a"));
        let (_, cmd) = s.pop_next(Instant::now()).unwrap();
        assert_eq!(s.pending_len(), 0);
        assert_eq!(s.executing_len(), 1);
        assert!(s.contains(&cmd.fingerprint()));
        assert!(s.finish(&cmd.fingerprint()).is_some());
        assert!(!s.contains(&cmd.fingerprint()));
    }

    #[test]
    fn requeue_restores_original_position() {
        let mut s = QueueState::default();
        s.insert_new(5, fetch("a"));
        s.insert_new(5, fetch("b"));
        let now = Instant::now();
        let (_, first) = s.pop_next(now).unwrap();
        assert_eq!(first.account_name(), "a");
        assert!(s.requeue(5, first, now));
        let (_, again) = s.pop_next(now).unwrap();
        assert_eq!(again.account_name(), "a");
    }

    #[test]
    fn backing_off_command_is_skipped_until_due() {
        let mut s = QueueState::default();
        s.insert_new(9, fetch("post"));
        s.insert_new(5, fetch("later"));
        let now = Instant::now();
        let (_, first) = s.pop_next(now).unwrap();
        let due = now + Duration::from_secs(30);
        assert!(s.requeue(9, first, due));

        let (_, other) = s.pop_next(now).unwrap();
        assert_eq!(other.account_name(), "later");
        assert!(s.pop_next(now).is_none());
        assert_eq!(s.next_due(), Some(due));

        let (_, back) = s.pop_next(due).unwrap();
        assert_eq!(back.account_name(), "post");
    }

    #[test]
    fn drain_returns_queue_order() {
        let mut s = QueueState::default();
        s.insert_new(1, fetch("low"));
        s.insert_new(9, fetch("high"));
        s.insert_new(1, fetch("low2"));
        let names: Vec<String> = s
            .drain()
            .iter()
            .map(|c| c.account_name().to_string())
            .collect();
        assert_eq!(names, vec!["high", "low", "low2"]);
        assert_eq!(s.member_count(), 0);
    }
}
