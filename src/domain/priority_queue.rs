//! Thread-safe multi-level priority queue
//!
//! Items are grouped into FIFO buckets, one per priority value. Buckets are
//! created on first insert and dropped as soon as they empty, so the set of
//! active levels is always exactly the keys of the bucket map, kept sorted.
//! The lowest priority value is served first.
//!
//! A single coarse lock guards every operation. Iteration goes through
//! [`PriorityQueue::snapshot`], which copies the contents under that lock.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use super::error::ScheduleError;
use super::id::PrefixMatch;

#[derive(Debug)]
pub struct PriorityQueue<T, P = i64> {
    buckets: Mutex<BTreeMap<P, VecDeque<T>>>,
}

impl<T, P: Ord + Clone> PriorityQueue<T, P> {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(BTreeMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<P, VecDeque<T>>> {
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends `item` to the tail of the bucket for `priority`
    pub fn put(&self, item: T, priority: P) {
        self.lock().entry(priority).or_default().push_back(item);
    }

    /// Removes and returns the head of the most urgent bucket
    pub fn get(&self) -> Result<(T, P), ScheduleError> {
        let mut buckets = self.lock();
        let mut entry = buckets.first_entry().ok_or(ScheduleError::Empty)?;
        let priority = entry.key().clone();
        let item = entry
            .get_mut()
            .pop_front()
            .ok_or(ScheduleError::Empty)?;
        if entry.get().is_empty() {
            entry.remove();
        }
        Ok((item, priority))
    }

    /// Removes the head of the most urgent bucket only if `pred` accepts it
    ///
    /// The check and the removal happen under one lock acquisition.
    pub fn pop_if(&self, pred: impl FnOnce(&T, &P) -> bool) -> Option<(T, P)> {
        let mut buckets = self.lock();
        let mut entry = buckets.first_entry()?;
        let accepted = match entry.get().front() {
            Some(item) => pred(item, entry.key()),
            None => false,
        };
        if !accepted {
            return None;
        }

        let priority = entry.key().clone();
        let item = entry.get_mut().pop_front()?;
        if entry.get().is_empty() {
            entry.remove();
        }
        Some((item, priority))
    }

    /// Total number of items across all buckets
    pub fn size(&self) -> usize {
        self.lock().values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of distinct active priority levels
    pub fn levels(&self) -> usize {
        self.lock().len()
    }

    /// Removes and returns the first item (in get order) matching `pred`
    pub fn remove_first(&self, mut pred: impl FnMut(&T) -> bool) -> Option<(T, P)> {
        let mut buckets = self.lock();
        let (priority, index) = buckets.iter().find_map(|(priority, bucket)| {
            bucket
                .iter()
                .position(&mut pred)
                .map(|index| (priority.clone(), index))
        })?;

        let bucket = buckets.get_mut(&priority)?;
        let item = bucket.remove(index)?;
        if bucket.is_empty() {
            buckets.remove(&priority);
        }
        Some((item, priority))
    }
}

impl<T: Clone, P: Ord + Clone> PriorityQueue<T, P> {
    /// Returns the head of the most urgent bucket without removing it
    pub fn peek(&self) -> Result<(T, P), ScheduleError> {
        let buckets = self.lock();
        buckets
            .iter()
            .next()
            .and_then(|(priority, bucket)| {
                bucket.front().map(|item| (item.clone(), priority.clone()))
            })
            .ok_or(ScheduleError::Empty)
    }

    /// Point-in-time copy ordered by (priority ascending, FIFO within priority)
    pub fn snapshot(&self) -> Vec<(T, P)> {
        self.lock()
            .iter()
            .flat_map(|(priority, bucket)| {
                bucket.iter().map(move |item| (item.clone(), priority.clone()))
            })
            .collect()
    }

    /// Returns the first item in get order whose id starts with `prefix`
    pub fn find(&self, prefix: &str) -> Result<T, ScheduleError>
    where
        T: PrefixMatch,
    {
        self.lock()
            .values()
            .flat_map(|bucket| bucket.iter())
            .find(|item| item.matches_prefix(prefix))
            .cloned()
            .ok_or_else(|| ScheduleError::NotFound(prefix.to_string()))
    }
}

impl<T, P: Ord + Clone + Default> PriorityQueue<T, P> {
    /// Inserts at the default priority
    pub fn put_default(&self, item: T) {
        self.put(item, P::default());
    }
}

impl<T, P: Ord + Clone> Default for PriorityQueue<T, P> {
    fn default() -> Self {
        Self::new()
    }
}
