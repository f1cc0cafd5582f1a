use std::collections::VecDeque;

use crate::error::{AutopilotError, AutopilotResult};

/// Fixed-capacity event history. Adding past capacity evicts the oldest
/// entry. Offset 0 is the most recent entry and iteration runs newest to
/// oldest.
#[derive(Debug, Clone)]
pub struct EventRing<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> EventRing<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an event, evicting the oldest once full.
    pub fn add(&mut self, event: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    /// Read `offset` entries back from the most recent one.
    pub fn get(&self, offset: usize) -> AutopilotResult<&T> {
        let len = self.entries.len();
        if offset >= len {
            return Err(AutopilotError::RingOffset { offset, len });
        }
        Ok(&self.entries[len - 1 - offset])
    }

    pub fn newest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn newest_mut(&mut self) -> Option<&mut T> {
        self.entries.back_mut()
    }

    /// Iterate newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_evicts_oldest_past_capacity() {
        let mut ring = EventRing::new(4);
        for i in 0..7 {
            ring.add(i);
        }
        assert_eq!(ring.len(), 4);
        // 0, 1, 2 evicted; newest-first order
        let entries: Vec<i32> = ring.iter().copied().collect();
        assert_eq!(entries, vec![6, 5, 4, 3]);
    }

    #[test]
    fn get_zero_is_newest() {
        let mut ring = EventRing::new(3);
        ring.add("a");
        ring.add("b");
        assert_eq!(*ring.get(0).unwrap(), "b");
        assert_eq!(*ring.get(1).unwrap(), "a");
    }

    #[test]
    fn get_past_len_is_error() {
        let mut ring = EventRing::new(3);
        ring.add(1);
        let err = ring.get(1).unwrap_err();
        assert!(matches!(
            err,
            AutopilotError::RingOffset { offset: 1, len: 1 }
        ));
    }

    #[test]
    fn get_on_empty_is_error() {
        let ring: EventRing<i32> = EventRing::new(3);
        assert!(ring.get(0).is_err());
        assert!(ring.newest().is_none());
    }

    #[test]
    fn iteration_is_newest_first_after_wrap() {
        let mut ring = EventRing::new(2);
        ring.add(1);
        ring.add(2);
        ring.add(3);
        let entries: Vec<i32> = ring.iter().copied().collect();
        assert_eq!(entries, vec![3, 2]);
        assert_eq!(*ring.get(0).unwrap(), 3);
        assert_eq!(*ring.get(1).unwrap(), 2);
    }

    #[test]
    fn capacity_is_fixed() {
        let ring: EventRing<u8> = EventRing::new(16);
        assert_eq!(ring.capacity(), 16);
        assert!(ring.is_empty());
    }
}
