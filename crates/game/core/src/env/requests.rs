use std::collections::VecDeque;

use crate::effect::EffectRequest;
use crate::state::RootId;

/// Bounded FIFO of pending effect requests.
///
/// Publishing assigns a fresh [`RootId`] to requests that carry none. A full
/// queue rejects the incoming request and counts it.
#[derive(Clone, Debug)]
pub struct RequestQueue {
    pending: VecDeque<EffectRequest>,
    capacity: usize,
    next_root: u64,
    dropped: u64,
}

impl RequestQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            capacity,
            next_root: 1,
            dropped: 0,
        }
    }

    /// Queues `request`, returning its root id, or `None` when full.
    pub fn publish(&mut self, mut request: EffectRequest) -> Option<RootId> {
        if self.pending.len() >= self.capacity {
            self.dropped += 1;
            tracing::warn!(
                target: "core::requests",
                template = %request.template,
                capacity = self.capacity,
                "request queue full, dropping request"
            );
            return None;
        }
        if request.root.is_none() {
            request.root = self.allocate_root();
        }
        let root = request.root;
        self.pending.push_back(request);
        Some(root)
    }

    pub fn allocate_root(&mut self) -> RootId {
        let root = RootId(self.next_root);
        self.next_root += 1;
        root
    }

    pub fn pop(&mut self) -> Option<EffectRequest> {
        self.pending.pop_front()
    }

    pub fn peek(&self) -> Option<&EffectRequest> {
        self.pending.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectRequest> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::with_capacity(crate::config::CoreConfig::DEFAULT_REQUEST_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{EntityHandle, TemplateId};

    fn request() -> EffectRequest {
        EffectRequest::new(TemplateId(1), EntityHandle::NULL, EntityHandle::new(0, 0))
    }

    #[test]
    fn zero_root_is_auto_assigned() {
        let mut queue = RequestQueue::with_capacity(4);
        let first = queue.publish(request()).unwrap();
        let second = queue.publish(request()).unwrap();
        let explicit = queue.publish(request().with_root(RootId(77))).unwrap();

        assert_ne!(first, second);
        assert!(!first.is_none());
        assert_eq!(explicit, RootId(77));
        assert_eq!(queue.pop().map(|r| r.root), Some(first));
    }

    #[test]
    fn full_queue_rejects_and_counts() {
        let mut queue = RequestQueue::with_capacity(1);
        assert!(queue.publish(request()).is_some());
        assert!(queue.publish(request()).is_none());
        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.len(), 1);
    }
}
