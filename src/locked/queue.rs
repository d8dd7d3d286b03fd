use std::collections::VecDeque;

use crate::adt::ConcurrentQueue;
use crate::lock::{Lock, SpinLock};
use crate::Value;

/// A queue guarded by a single global lock.
#[derive(Debug)]
pub struct Queue {
    data: Lock<SpinLock, VecDeque<Value>>,
}

impl Default for Queue {
    fn default() -> Self {
        Self {
            data: Lock::new(VecDeque::new()),
        }
    }
}

impl Queue {
    /// Creates a new, empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value to the back of the queue.
    pub fn enqueue(&self, value: Value) {
        self.data.lock().push_back(value);
    }

    /// Attempts to remove the value at the front of the queue.
    ///
    /// Returns `None` if the queue is empty; never blocks on emptiness.
    pub fn dequeue(&self) -> Option<Value> {
        self.data.lock().pop_front()
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

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fifo_serial() {
        let queue = Queue::new();
        assert_eq!(queue.dequeue(), None);

        for v in 1..=3 {
            queue.enqueue(v);
        }
        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), Some(3));
        assert_eq!(queue.dequeue(), None);
    }
}
