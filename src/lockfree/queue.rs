//! Michael-Scott lock-free queue.
//!
//! Michael and Scott. Simple, Fast, and Practical Non-Blocking and Blocking
//! Concurrent Queue Algorithms. PODC 1996. <http://dl.acm.org/citation.cfm?id=248106>

use core::mem;
use core::sync::atomic::Ordering::*;

use crossbeam_epoch::{pin, Atomic, Owned, Shared};
use crossbeam_utils::CachePadded;

use crate::adt::ConcurrentQueue;
use crate::Value;

/// Michael-Scott queue.
///
/// Usable with any number of producers and consumers. Retired sentinels are
/// retained, not freed (see the [module documentation](crate::lockfree)).
// The representation is a singly linked list with a sentinel node at the
// front: `head` always points at the sentinel, the logical front element
// lives in `head.next`, and `tail` may lag behind the actual last node by
// at most one link.
#[derive(Debug)]
pub struct Queue {
    head: CachePadded<Atomic<Node>>,
    tail: CachePadded<Atomic<Node>>,
}

#[derive(Debug)]
struct Node {
    /// Dead storage in the sentinel; meaningful in every other node.
    value: Value,
    next: Atomic<Node>,
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Queue {
    /// Creates a new, empty queue.
    pub fn new() -> Self {
        let sentinel = Box::into_raw(Box::new(Node {
            value: 0,
            next: Atomic::null(),
        }))
        .cast_const();

        Self {
            head: CachePadded::new(sentinel.into()),
            tail: CachePadded::new(sentinel.into()),
        }
    }

    /// Adds a value to the back of the queue.
    pub fn enqueue(&self, value: Value) {
        let mut new = Owned::new(Node {
            value,
            next: Atomic::null(),
        });

        let guard = pin();

        loop {
            // We push onto the tail, so we'll start optimistically by looking there first.
            let tail = self.tail.load(Acquire, &guard);
            let tail_ref = unsafe { tail.deref() };
            let next = tail_ref.next.load(Acquire, &guard);

            // If `tail` is not the actual tail, try to "help" by moving the
            // tail pointer forward.
            if !next.is_null() {
                let _ = self.tail.compare_exchange(tail, next, Release, Relaxed, &guard);
                continue;
            }

            // Looks like the actual tail; attempt to link at `tail.next`.
            match tail_ref
                .next
                .compare_exchange(Shared::null(), new, Release, Relaxed, &guard)
            {
                Ok(new) => {
                    // Try to move the tail pointer forward. Failure is
                    // benign: somebody else already advanced it for us.
                    let _ = self.tail.compare_exchange(tail, new, Release, Relaxed, &guard);
                    break;
                }
                Err(e) => new = e.new,
            }
        }
    }

    /// Attempts to remove the value at the front of the queue.
    ///
    /// Returns `None` if the queue is observed to be empty; never blocks on
    /// emptiness.
    pub fn dequeue(&self) -> Option<Value> {
        let guard = pin();
        loop {
            let head = self.head.load(Acquire, &guard);
            let next = unsafe { head.deref() }.next.load(Acquire, &guard);

            // The sentinel has no successor: the queue is empty.
            let next_ref = unsafe { next.as_ref() }?;

            // A tail still stuck on the sentinel is stale; help it over
            // before moving `head` past it.
            let tail = self.tail.load(Relaxed, &guard);
            if tail == head {
                let _ = self.tail.compare_exchange(tail, next, Release, Relaxed, &guard);
            }

            if self
                .head
                .compare_exchange(head, next, Release, Relaxed, &guard)
                .is_ok()
            {
                // `next` is the new sentinel; its value slot is logically
                // dead from here on. The old sentinel `head` is retired but
                // stays allocated for concurrent snapshot holders.
                return Some(next_ref.value);
            }
        }
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        // Free the sentinel, then walk and free whatever is still linked
        // behind it. Nodes retired by `dequeue` are not reachable from the
        // sentinel anymore and stay leaked.
        let sentinel = mem::take(&mut *self.head);

        // SAFETY: `dequeue()` never frees the current sentinel, so it is
        // still valid, and `&mut self` guarantees exclusive access.
        let mut o_curr = unsafe { sentinel.into_owned() }.into_box().next;

        // SAFETY: all non-null nodes in the chain were made in `enqueue()`
        // and are reachable only from here.
        while let Some(curr) = unsafe { o_curr.try_into_owned() }.map(Owned::into_box) {
            o_curr = curr.next;
        }
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
    use std::thread::scope;

    use super::*;

    const CONC_COUNT: Value = 100_000;

    #[test]
    fn fifo_serial() {
        let q = Queue::new();
        q.enqueue(1);
        q.enqueue(2);
        q.enqueue(3);
        assert_eq!(q.dequeue(), Some(1));
        assert_eq!(q.dequeue(), Some(2));
        assert_eq!(q.dequeue(), Some(3));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn empty_on_start() {
        let q = Queue::new();
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn fifo_many_seq() {
        let q = Queue::new();
        for i in 0..200 {
            q.enqueue(i);
        }
        for i in 0..200 {
            assert_eq!(q.dequeue(), Some(i));
        }
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn spsc_in_order() {
        let q = Queue::new();

        scope(|scope| {
            scope.spawn(|| {
                let mut next = 0;

                while next < CONC_COUNT {
                    if let Some(elem) = q.dequeue() {
                        assert_eq!(elem, next);
                        next += 1;
                    }
                }
            });

            for i in 0..CONC_COUNT {
                q.enqueue(i);
            }
        });
    }

    #[test]
    fn mpmc_per_producer_order() {
        // Two producers, told apart by sign; each consumer must see each
        // producer's values in enqueue order.
        let q = Queue::new();

        scope(|scope| {
            scope.spawn(|| {
                for i in 0..CONC_COUNT {
                    q.enqueue(i);
                }
            });
            scope.spawn(|| {
                for i in 0..CONC_COUNT {
                    q.enqueue(-CONC_COUNT + i);
                }
            });
            for _ in 0..2 {
                scope.spawn(|| {
                    let mut pos = vec![];
                    let mut neg = vec![];
                    for _ in 0..CONC_COUNT {
                        match q.dequeue() {
                            Some(x) if x >= 0 => pos.push(x),
                            Some(x) => neg.push(x),
                            None => {}
                        }
                    }

                    let mut pos_sorted = pos.clone();
                    let mut neg_sorted = neg.clone();
                    pos_sorted.sort();
                    neg_sorted.sort();

                    assert_eq!(pos, pos_sorted);
                    assert_eq!(neg, neg_sorted);
                });
            }
        });
    }
}
