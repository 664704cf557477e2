//! Delay-tolerant send queue: a bounded FIFO of datagrams awaiting a usable
//! route. No eviction on overflow, no per-item TTL, no ack — delivery is
//! best-effort once a route appears.

use crate::config::NodeId;
use std::collections::VecDeque;
use std::time::Instant;
use tracing::debug;

/// One outbound datagram still awaiting a route.
pub struct DtnItem {
    pub dest_id: NodeId,
    pub payload: Vec<u8>,
    pub enqueue_time: Instant,
}

pub struct DtnQueue {
    items: VecDeque<DtnItem>,
    capacity: usize,
}

impl DtnQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a new item. Returns `false` without mutating the queue when
    /// it is already at capacity — there is no eviction policy here.
    pub fn enqueue(&mut self, dest_id: NodeId, payload: Vec<u8>) -> bool {
        if self.items.len() >= self.capacity {
            debug!(%dest_id, "dtn queue full, dropping new item");
            return false;
        }
        debug!(%dest_id, bytes = payload.len(), "dtn item queued");
        self.items.push_back(DtnItem {
            dest_id,
            payload,
            enqueue_time: Instant::now(),
        });
        true
    }

    pub fn front(&self) -> Option<&DtnItem> {
        self.items.front()
    }

    /// Remove and discard the head item, regardless of whether its send
    /// actually succeeded — the drain loop is fire-and-forget once a route
    /// exists.
    pub fn pop_front(&mut self) -> Option<DtnItem> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_past_capacity_fails_without_overwrite() {
        let mut q = DtnQueue::new(2);
        assert!(q.enqueue(NodeId::new("A").unwrap(), vec![1]));
        assert!(q.enqueue(NodeId::new("B").unwrap(), vec![2]));
        assert!(!q.enqueue(NodeId::new("C").unwrap(), vec![3]));
        assert_eq!(q.len(), 2);
        assert_eq!(q.front().unwrap().dest_id.as_str(), "A");
    }

    #[test]
    fn fifo_order_preserved() {
        let mut q = DtnQueue::new(4);
        q.enqueue(NodeId::new("A").unwrap(), vec![1]);
        q.enqueue(NodeId::new("B").unwrap(), vec![2]);
        let first = q.pop_front().unwrap();
        assert_eq!(first.dest_id.as_str(), "A");
        let second = q.pop_front().unwrap();
        assert_eq!(second.dest_id.as_str(), "B");
        assert!(q.pop_front().is_none());
    }

    #[test]
    fn head_remains_when_no_route_available() {
        let mut q = DtnQueue::new(4);
        q.enqueue(NodeId::new("Z").unwrap(), vec![9, 9]);
        // simulate three failed drain ticks: head is only inspected, never popped
        for _ in 0..3 {
            assert!(q.front().is_some());
        }
        assert_eq!(q.len(), 1);
    }
}
