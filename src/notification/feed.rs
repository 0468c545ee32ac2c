//! In-memory notification list for one session.
//!
//! Ids are unique within the list at all times. Pushed entries go to the
//! front; the initially fetched list keeps the server's order.
//!
//! Mutations made before the initial fetch lands are remembered and replayed
//! onto the fetched entries, so the fetch never resurrects cleared entries or
//! unread flags.

use std::collections::HashSet;

use super::Notification;

/// Result of offering a pushed notification to the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Inserted,
    Duplicate,
}

/// Local mutations recorded while the initial fetch is outstanding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PendingIntents {
    cleared: bool,
    all_read: bool,
    read_ids: HashSet<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFeed {
    entries: Vec<Notification>,
    loaded: bool,
    pending: PendingIntents,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the initial fetch into whatever pushes already arrived.
    ///
    /// Pushed entries unknown to the server stay in front. An id present on
    /// both sides keeps the fetched copy, read if either copy was read.
    /// Entries only the fetch knows about get the pending intents applied:
    /// dropped after a clear, read after a mark-all or a matching mark.
    pub fn merge_initial(&mut self, fetched: Vec<Notification>) {
        let pending = std::mem::take(&mut self.pending);
        self.loaded = true;

        let held: HashSet<i64> = self.entries.iter().map(|n| n.id).collect();
        let mut seen = HashSet::with_capacity(fetched.len());
        let mut merged_tail = Vec::with_capacity(fetched.len());
        for mut notification in fetched {
            if !seen.insert(notification.id) {
                continue;
            }
            if !held.contains(&notification.id) {
                if pending.cleared {
                    continue;
                }
                if pending.all_read || pending.read_ids.contains(&notification.id) {
                    notification.read = true;
                }
            }
            merged_tail.push(notification);
        }

        let mut head = Vec::new();
        for local in self.entries.drain(..) {
            match merged_tail.iter_mut().find(|n| n.id == local.id) {
                Some(remote) => remote.read |= local.read,
                None => head.push(local),
            }
        }

        head.extend(merged_tail);
        self.entries = head;
    }

    /// Prepend a pushed notification unless its id is already present
    pub fn push(&mut self, notification: Notification) -> PushOutcome {
        if self.contains(notification.id) {
            return PushOutcome::Duplicate;
        }
        self.entries.insert(0, notification);
        PushOutcome::Inserted
    }

    /// Whether the initial fetch has been merged
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Returns true if an unread entry was flipped
    pub fn mark_read(&mut self, id: i64) -> bool {
        if !self.loaded {
            self.pending.read_ids.insert(id);
        }
        match self.entries.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.read => {
                n.read = true;
                true
            }
            _ => false,
        }
    }

    /// Returns the number of entries that were unread
    pub fn mark_all_read(&mut self) -> usize {
        if !self.loaded {
            self.pending.all_read = true;
        }
        let mut flipped = 0;
        for n in self.entries.iter_mut().filter(|n| !n.read) {
            n.read = true;
            flipped += 1;
        }
        flipped
    }

    /// Returns the number of entries removed
    pub fn clear(&mut self) -> usize {
        if !self.loaded {
            self.pending = PendingIntents {
                cleared: true,
                ..Default::default()
            };
        }
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.entries.iter().any(|n| n.id == id)
    }

    pub fn get(&self, id: i64) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Notification] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<i64> {
        self.entries.iter().map(|n| n.id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
