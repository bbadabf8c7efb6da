//! Discrete event queue
//!
//! Events are ordered by time, then by insertion order, so two events
//! scheduled for the same instant always come out in the order they went in.

use bytes::Bytes;
use selrep_protocol::{Entity, Timestamp};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Something scheduled to happen inside the emulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    /// The application produces its next message
    AppMessage,
    /// Wire bytes reach `to`
    Arrival { to: Entity, bytes: Bytes },
    /// A timer armed with `generation` expires
    Timeout { entity: Entity, generation: u64 },
}

#[derive(Debug)]
struct Scheduled {
    at: Timestamp,
    order: u64,
    pending: Pending,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.order == other.order
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        (other.at, other.order).cmp(&(self.at, self.order))
    }
}

/// Min-heap of pending events
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Scheduled>,
    next_order: u64,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `pending` at `at`
    pub fn push(&mut self, at: Timestamp, pending: Pending) {
        let order = self.next_order;
        self.next_order += 1;
        self.heap.push(Scheduled { at, order, pending });
    }

    /// Remove the earliest event
    pub fn pop(&mut self) -> Option<(Timestamp, Pending)> {
        self.heap.pop().map(|s| (s.at, s.pending))
    }

    /// Time of the earliest event
    pub fn peek_time(&self) -> Option<Timestamp> {
        self.heap.peek().map(|s| s.at)
    }

    /// Check if no events are pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_offset(Duration::from_millis(ms))
    }

    #[test]
    fn test_time_order() {
        let mut queue = EventQueue::new();
        queue.push(at(5), Pending::AppMessage);
        queue.push(
            at(2),
            Pending::Timeout {
                entity: Entity::Sender,
                generation: 1,
            },
        );

        assert_eq!(queue.peek_time(), Some(at(2)));
        assert!(matches!(queue.pop(), Some((_, Pending::Timeout { .. }))));
        assert_eq!(queue.pop(), Some((at(5), Pending::AppMessage)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_for_equal_times() {
        let mut queue = EventQueue::new();
        for generation in 0..5 {
            queue.push(
                at(1),
                Pending::Timeout {
                    entity: Entity::Sender,
                    generation,
                },
            );
        }

        let order: Vec<u64> = std::iter::from_fn(|| queue.pop())
            .map(|(_, p)| match p {
                Pending::Timeout { generation, .. } => generation,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }
}
