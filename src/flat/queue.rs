use std::collections::VecDeque;

use super::{Core, Sequential};
use crate::adt::ConcurrentQueue;
use crate::Value;

impl Sequential for VecDeque<Value> {
    fn insert(&mut self, value: Value) {
        self.push_back(value);
    }

    fn remove(&mut self) -> Option<Value> {
        self.pop_front()
    }
}

/// Flat-combining queue.
#[derive(Debug, Default)]
pub struct Queue {
    core: Core<VecDeque<Value>>,
}

impl Queue {
    /// Creates a new, empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value to the back of the queue.
    pub fn enqueue(&self, value: Value) {
        self.core.insert(value);
    }

    /// Attempts to remove the value at the front of the queue.
    ///
    /// Returns `None` if the queue was empty when the combiner served the
    /// request; never blocks on emptiness.
    pub fn dequeue(&self) -> Option<Value> {
        self.core.remove()
    }
}

impl ConcurrentQueue for Queue {
    fn enqueue(&self, value: Value) {
        Queue::enqueue(self, value);
    }

    fn dequeue(&self) -> Option<Value> {
        Queue::dequeue(self)
    }
}
