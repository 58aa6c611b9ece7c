//! Reference-counted blocking table ("limbo")
//!
//! Each blocked item carries one reference per unresolved blocker. Resolving
//! a blocker drops one reference from everything it was blocking; an item
//! whose count reaches zero is evicted and handed to the release callback.
//!
//! Items and blockers are keyed by identity directly (task ids in practice).

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use tracing::debug;

use super::error::ScheduleError;
use super::id::PrefixMatch;

#[derive(Debug)]
pub struct Limbo<K> {
    /// Reference count per blocked item
    refcounts: HashMap<K, usize>,

    /// Items blocked by each unresolved blocker, in blocking order
    blockers: HashMap<K, Vec<K>>,
}

impl<K: Clone + Eq + Hash + Display> Limbo<K> {
    pub fn new() -> Self {
        Self {
            refcounts: HashMap::new(),
            blockers: HashMap::new(),
        }
    }

    /// Records that `item` cannot proceed until `blocked_by` resolves
    pub fn block(&mut self, item: K, blocked_by: K) -> Result<(), ScheduleError> {
        let blocked = self.blockers.entry(blocked_by.clone()).or_default();
        if blocked.contains(&item) {
            return Err(ScheduleError::DuplicateBlock {
                item: item.to_string(),
                blocker: blocked_by.to_string(),
            });
        }

        blocked.push(item.clone());
        *self.refcounts.entry(item).or_insert(0) += 1;
        Ok(())
    }

    /// Resolves `resolved` and releases every item left with no blockers
    ///
    /// Returns the number of items released. Resolving a key nothing is
    /// blocked on is a no-op, so repeated calls never release twice.
    pub fn unblock(&mut self, resolved: &K, mut release: impl FnMut(K)) -> usize {
        let Some(blocked) = self.blockers.remove(resolved) else {
            debug!("unblock '{}': nothing was blocked on it", resolved);
            return 0;
        };

        let mut released = 0;
        for item in blocked {
            let Some(count) = self.refcounts.get_mut(&item) else {
                panic!("BUG: blocked item '{}' has no reference count", item);
            };
            let Some(remaining) = count.checked_sub(1) else {
                panic!("BUG: negative refcount for '{}'", item);
            };
            *count = remaining;

            if remaining == 0 {
                self.refcounts.remove(&item);
                release(item);
                released += 1;
            }
        }
        released
    }

    /// Returns true if `item` is waiting on at least one blocker
    pub fn is_blocked(&self, item: &K) -> bool {
        self.refcounts.contains_key(item)
    }

    /// Number of unresolved blockers for `item`
    pub fn refcount(&self, item: &K) -> usize {
        self.refcounts.get(item).copied().unwrap_or(0)
    }

    /// Unresolved blockers of `item`
    pub fn blockers_of(&self, item: &K) -> Vec<K> {
        self.blockers
            .iter()
            .filter(|(_, blocked)| blocked.contains(item))
            .map(|(blocker, _)| blocker.clone())
            .collect()
    }

    /// All blocked items, in no particular order
    pub fn items(&self) -> impl Iterator<Item = &K> {
        self.refcounts.keys()
    }

    pub fn len(&self) -> usize {
        self.refcounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refcounts.is_empty()
    }
}

impl<K: Clone + Eq + Hash + Display + PrefixMatch> Limbo<K> {
    /// Linear prefix-match scan over blocked items
    pub fn find(&self, prefix: &str) -> Result<&K, ScheduleError> {
        self.refcounts
            .keys()
            .find(|item| item.matches_prefix(prefix))
            .ok_or_else(|| ScheduleError::NotFound(prefix.to_string()))
    }
}

impl<K: Clone + Eq + Hash + Display> Default for Limbo<K> {
    fn default() -> Self {
        Self::new()
    }
}
