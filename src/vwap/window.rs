//! Fixed-capacity FIFO window.
//!
//! Pushing into a full window evicts the oldest entry and hands it back to
//! the caller, which needs its values to correct running totals.

use std::collections::VecDeque;

use crate::utils::error::{Error, Result};

/// Entries reserved up front; larger windows grow on demand.
const PREALLOCATE_LIMIT: usize = 1024;

/// Behaviour of a bounded, insertion-ordered queue.
pub trait BoundedQueue<T> {
    /// Append at the tail. When full, the head is removed first and returned.
    fn push(&mut self, item: T) -> Option<T>;

    /// Remove and return the oldest entry.
    fn pop(&mut self) -> Result<T>;

    /// Peek at the oldest entry.
    fn head(&self) -> Result<&T>;

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }
}

/// `VecDeque`-backed window holding at most `capacity` entries.
///
/// Mutation requires `&mut self`, so a window shared between tasks must sit
/// behind a lock held only for a single push or peek.
#[derive(Debug, Clone)]
pub struct FixedWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> FixedWindow<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidArgument("window capacity must be at least 1".into()));
        }
        Ok(Self { items: VecDeque::with_capacity(capacity.min(PREALLOCATE_LIMIT)), capacity })
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }
}

impl<T> BoundedQueue<T> for FixedWindow<T> {
    fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity { self.items.pop_front() } else { None };
        self.items.push_back(item);
        evicted
    }

    fn pop(&mut self) -> Result<T> {
        self.items.pop_front().ok_or(Error::EmptyWindow)
    }

    fn head(&self) -> Result<&T> {
        self.items.front().ok_or(Error::EmptyWindow)
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case::single_item_capacity_reached(1, &[1], 1, true)]
    #[case::single_item_capacity_available(2, &[1], 1, false)]
    #[case::slide_window_with_one_slot(1, &[1, 2], 2, true)]
    #[case::slide_window_twice(3, &[1, 2, 3, 4, 5], 3, true)]
    fn test_push_and_head(
        #[case] capacity: usize,
        #[case] points: &[u32],
        #[case] head: u32,
        #[case] is_full: bool,
    ) {
        let mut window = FixedWindow::new(capacity).unwrap();
        for point in points {
            window.push(*point);
        }
        assert_eq!(window.is_full(), is_full);
        assert_eq!(*window.head().unwrap(), head);
        assert!(window.len() <= capacity);
    }

    #[test]
    fn test_eviction_is_returned_in_fifo_order() {
        let mut window = FixedWindow::new(2).unwrap();
        assert_eq!(window.push("a"), None);
        assert_eq!(window.push("b"), None);
        assert_eq!(window.push("c"), Some("a"));
        assert_eq!(window.push("d"), Some("b"));
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec!["c", "d"]);
    }

    #[test]
    fn test_empty_window() {
        let mut window: FixedWindow<u8> = FixedWindow::new(3).unwrap();
        assert!(window.is_empty());
        assert!(!window.is_full());
        assert_matches!(window.head(), Err(Error::EmptyWindow));
        assert_matches!(window.pop(), Err(Error::EmptyWindow));
    }

    #[test]
    fn test_pop_removes_oldest() {
        let mut window = FixedWindow::new(3).unwrap();
        window.push(10);
        window.push(20);
        assert_eq!(window.pop().unwrap(), 10);
        assert_eq!(*window.head().unwrap(), 20);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_matches!(FixedWindow::<u8>::new(0), Err(Error::InvalidArgument(_)));
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut window = FixedWindow::new(usize::MAX).unwrap();
        assert_eq!(window.capacity(), usize::MAX);
        assert_eq!(window.push(1u8), None);
        assert!(!window.is_full());
    }
}
