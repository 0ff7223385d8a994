//! # Bounded Message Buffer
//!
//! A fixed-capacity, oldest-evicted replay log for broadcast messages.
//!
//! ## How It Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     MessageBuffer (capacity 4)                          │
//! │                                                                         │
//! │  push(a)  push(b)  push(c)  push(d)      push(e)                       │
//! │                                                                         │
//! │  [a]      [a,b]    [a,b,c]  [a,b,c,d]    [b,c,d,e]                     │
//! │                                           ▲                             │
//! │                                           └── a evicted (oldest)        │
//! │                                                                         │
//! │  iter() always yields oldest → newest                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Backed by a `VecDeque` so eviction is a head-index bump, not an
//! array shift. The buffer serializes with its capacity so a persisted
//! buffer restores with the same bound.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Fixed-capacity replay buffer. Oldest entries are evicted on overflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> MessageBuffer<T> {
    /// Creates an empty buffer with the given capacity.
    ///
    /// A capacity of zero is nonsensical for a replay log and is bumped
    /// to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        MessageBuffer {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends an item, evicting the oldest one if the buffer is full.
    ///
    /// Returns the evicted item, if any.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Iterates the buffered items, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if no items are buffered.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The fixed capacity bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for MessageBuffer<T> {
    fn default() -> Self {
        MessageBuffer::new(crate::DEFAULT_BUFFER_CAPACITY)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_capacity() {
        let mut buf = MessageBuffer::new(3);
        assert!(buf.is_empty());

        assert_eq!(buf.push(1), None);
        assert_eq!(buf.push(2), None);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_oldest_evicted_on_overflow() {
        let mut buf = MessageBuffer::new(3);
        buf.push("a");
        buf.push("b");
        buf.push("c");

        assert_eq!(buf.push("d"), Some("a"));
        assert_eq!(buf.push("e"), Some("b"));
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec!["c", "d", "e"]);
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let mut buf = MessageBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push(1);
        assert_eq!(buf.push(2), Some(1));
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_serde_preserves_order_and_capacity() {
        let mut buf = MessageBuffer::new(2);
        buf.push(10);
        buf.push(20);
        buf.push(30); // evicts 10

        let json = serde_json::to_string(&buf).unwrap();
        let restored: MessageBuffer<i32> = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.capacity(), 2);
        assert_eq!(restored.iter().copied().collect::<Vec<_>>(), vec![20, 30]);
        assert_eq!(restored, buf);
    }
}
