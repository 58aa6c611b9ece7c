//! Time-ordered holding area for sleeping tasks ("dorm")
//!
//! Entries are kept in a [`PriorityQueue`] keyed by their absolute wake time,
//! so the earliest wake-up is always at the head. Nothing wakes on its own:
//! [`Dorm::reveille`] has to be called, and only then are due entries handed
//! to the release callback.
//!
//! Entries due at the same sweep are released in wake-time order. When the
//! callback pushes onto a stack, the most urgent sleeper therefore ends up
//! *underneath* the ones that woke after it.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::clock::Clock;
use super::error::ScheduleError;
use super::id::PrefixMatch;
use super::priority_queue::PriorityQueue;

pub struct Dorm<T> {
    clock: Arc<dyn Clock>,
    queue: PriorityQueue<T, DateTime<Utc>>,
}

impl<T> Dorm<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            queue: PriorityQueue::new(),
        }
    }

    /// Puts `item` to sleep for `duration` from now
    pub fn sleep(&self, item: T, duration: Duration) -> DateTime<Utc> {
        let wake_at = self.clock.now() + duration;
        self.wake_at(item, wake_at);
        wake_at
    }

    /// Puts `item` to sleep until `timestamp`
    pub fn wake_at(&self, item: T, timestamp: DateTime<Utc>) {
        self.queue.put(item, timestamp);
    }

    /// Releases every entry whose wake time is at or before now
    ///
    /// Stops at the first entry still in the future without consuming it.
    /// Returns the number of entries released.
    pub fn reveille(&self, mut release: impl FnMut(T)) -> usize {
        let now = self.clock.now();
        let mut released = 0;
        loop {
            let Some((item, _)) = self.queue.pop_if(|_, wake_at| *wake_at <= now) else {
                break;
            };
            release(item);
            released += 1;
        }
        released
    }

    /// Wakes a specific entry immediately, regardless of its wake time
    pub fn wake(&self, pred: impl FnMut(&T) -> bool) -> Option<(T, DateTime<Utc>)> {
        self.queue.remove_first(pred)
    }

    pub fn len(&self) -> usize {
        self.queue.size()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl<T: Clone> Dorm<T> {
    /// Earliest pending entry
    pub fn peek(&self) -> Result<(T, DateTime<Utc>), ScheduleError> {
        self.queue.peek()
    }

    /// Sleeping entries with their wake times, earliest first
    pub fn entries(&self) -> Vec<(T, DateTime<Utc>)> {
        self.queue.snapshot()
    }

    pub fn find(&self, prefix: &str) -> Result<T, ScheduleError>
    where
        T: PrefixMatch,
    {
        self.queue.find(prefix)
    }
}
