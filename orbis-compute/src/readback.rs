//! # Readback Queue
//!
//! Host code never looks at simulation state directly. It queues a
//! request against a variable, and the next `compute()` delivers a copy of
//! that variable's freshly computed texture together with the request.
//!
//! Delivery is one-shot and FIFO per variable: a request is removed from
//! the queue the moment it is handed out.

use std::collections::{HashMap, VecDeque};

use crate::graph::VariableId;
use crate::texture::Texture;

/// Pending readback requests, keyed by variable
#[derive(Debug)]
pub struct ReadbackQueue<R> {
    pending: HashMap<VariableId, VecDeque<R>>,
}

/// A delivered readback: the request and the texture it asked for
#[derive(Debug, Clone)]
pub struct Readback<R> {
    pub variable: VariableId,
    pub request: R,
    pub data: Texture,
}

impl<R> Default for ReadbackQueue<R> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }
}

impl<R> ReadbackQueue<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `request` against `variable`
    pub fn request(&mut self, variable: VariableId, request: R) {
        self.pending.entry(variable).or_default().push_back(request);
    }

    /// Remove and return every request queued against `variable`, oldest first
    pub fn take(&mut self, variable: VariableId) -> VecDeque<R> {
        self.pending.remove(&variable).unwrap_or_default()
    }

    /// Number of requests waiting on `variable`
    pub fn pending(&self, variable: VariableId) -> usize {
        self.pending.get(&variable).map_or(0, VecDeque::len)
    }

    /// Total requests waiting
    pub fn len(&self) -> usize {
        self.pending.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the requests matching `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&R) -> bool) {
        for queue in self.pending.values_mut() {
            queue.retain(|r| keep(r));
        }
        self.pending.retain(|_, queue| !queue.is_empty());
    }

    /// Discard every pending request (e.g. after losing the device);
    /// returns how many were dropped
    pub fn drop_pending(&mut self) -> usize {
        let dropped = self.len();
        self.pending.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_per_variable() {
        let a = VariableId::from_index(0);
        let b = VariableId::from_index(1);
        let mut queue = ReadbackQueue::new();
        queue.request(a, 1);
        queue.request(b, 10);
        queue.request(a, 2);

        assert_eq!(queue.pending(a), 2);
        assert_eq!(queue.take(a).into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(queue.pending(a), 0);
        assert!(queue.take(a).is_empty(), "requests are one-shot");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_retain_and_drop() {
        let a = VariableId::from_index(0);
        let mut queue = ReadbackQueue::new();
        for i in 0..5 {
            queue.request(a, i);
        }
        queue.retain(|&r| r % 2 == 0);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drop_pending(), 3);
        assert!(queue.is_empty());
    }
}
