//! LIFO stack of tasks currently in play
//!
//! Interruptions land on top; finishing or shelving the top task exposes
//! whatever was being worked on before.

use super::error::ScheduleError;
use super::id::PrefixMatch;

#[derive(Debug, Clone)]
pub struct ActiveStack<T> {
    items: Vec<T>,
}

impl<T> ActiveStack<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Rebuilds a stack from items listed bottom-first
    pub fn from_bottom_up(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Result<T, ScheduleError> {
        self.items.pop().ok_or(ScheduleError::Empty)
    }

    pub fn peek(&self) -> Result<&T, ScheduleError> {
        self.items.last().ok_or(ScheduleError::Empty)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Most-recent-first listing
    pub fn dump(&self) -> impl Iterator<Item = &T> {
        self.items.iter().rev()
    }

    /// Bottom-first listing, the order [`ActiveStack::from_bottom_up`] expects
    pub fn bottom_up(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Removes the first item (bottom-first) matching `pred`
    pub fn remove_where(&mut self, pred: impl FnMut(&T) -> bool) -> Option<T> {
        let index = self.items.iter().position(pred)?;
        Some(self.items.remove(index))
    }
}

impl<T: PrefixMatch> ActiveStack<T> {
    /// Prefix-match search, scanning from the bottom of the stack
    pub fn find(&self, prefix: &str) -> Result<&T, ScheduleError> {
        self.items
            .iter()
            .find(|item| item.matches_prefix(prefix))
            .ok_or_else(|| ScheduleError::NotFound(prefix.to_string()))
    }
}

impl<T> Default for ActiveStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;

    #[test]
    fn push_pop_is_lifo() {
        let mut stack = ActiveStack::new();
        stack.push(1);
        stack.push(2);
        stack.push(3);

        assert_eq!(stack.peek(), Ok(&3));
        assert_eq!(stack.pop(), Ok(3));
        assert_eq!(stack.pop(), Ok(2));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn empty_stack_fails_with_empty() {
        let mut stack: ActiveStack<u8> = ActiveStack::new();
        assert_eq!(stack.pop(), Err(ScheduleError::Empty));
        assert_eq!(stack.peek(), Err(ScheduleError::Empty));
        assert!(stack.is_empty());
    }

    #[test]
    fn dump_is_most_recent_first() {
        let stack = ActiveStack::from_bottom_up(vec!["old", "mid", "new"]);
        assert_eq!(stack.dump().copied().collect::<Vec<_>>(), vec!["new", "mid", "old"]);
        assert_eq!(stack.bottom_up().copied().collect::<Vec<_>>(), vec!["old", "mid", "new"]);
    }

    #[test]
    fn find_by_prefix() {
        let mut stack = ActiveStack::new();
        let first = Task::new("First", "quick");
        let second = Task::new("Second", "quick");
        stack.push(first.clone());
        stack.push(second.clone());

        assert_eq!(stack.find(second.id.short()).unwrap().id, second.id);
        assert_eq!(stack.find(first.id.as_str()).unwrap().id, first.id);
    }

    #[test]
    fn find_missing_is_not_found() {
        let mut stack = ActiveStack::new();
        stack.push(Task::new("Only", "quick"));
        assert_eq!(
            stack.find("not-hex").unwrap_err(),
            ScheduleError::NotFound("not-hex".to_string())
        );
    }

    #[test]
    fn remove_where_keeps_order() {
        let mut stack = ActiveStack::from_bottom_up(vec![1, 2, 3]);
        assert_eq!(stack.remove_where(|n| *n == 2), Some(2));
        assert_eq!(stack.remove_where(|n| *n == 9), None);
        assert_eq!(stack.bottom_up().copied().collect::<Vec<_>>(), vec![1, 3]);
    }
}
