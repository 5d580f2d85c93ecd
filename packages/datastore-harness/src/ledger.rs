//! Keys queued for deletion and keys already deleted.

use std::collections::HashSet;

use datastore_core::{Entity, Key};

/// Session-scoped record of every key a deletion was requested for.
///
/// Distinguishes entities that are still visible because deletes have not
/// converged from entities that should not be there at all.
#[derive(Debug, Clone, Default)]
pub struct DeletedKeyLedger {
    keys: HashSet<Key>,
}

impl DeletedKeyLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records keys, returning how many were not already known.
    pub fn record<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = Key>,
    {
        keys.into_iter()
            .filter(|key| self.keys.insert(key.clone()))
            .count()
    }

    /// Returns true if a deletion was requested for `key`.
    pub fn contains(&self, key: &Key) -> bool {
        self.keys.contains(key)
    }

    /// Returns the keys of `entities` that are not in the ledger.
    pub fn unaccounted(&self, entities: &[Entity]) -> Vec<Key> {
        entities
            .iter()
            .map(Entity::key)
            .filter(|key| !self.contains(key))
            .cloned()
            .collect()
    }

    /// Number of recorded keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Keys one test asked to have deleted at teardown, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PendingDeletions {
    keys: Vec<Key>,
}

impl PendingDeletions {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a key. Returns false if it was already queued.
    pub fn push(&mut self, key: Key) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    /// Queued keys.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Drains the queue.
    pub fn take(&mut self) -> Vec<Key> {
        std::mem::take(&mut self.keys)
    }

    /// Number of queued keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
