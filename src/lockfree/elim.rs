//! Elimination-backoff stack.
//!
//! Hendler, Shavit, and Yerushalmi. A Scalable Lock-free Stack Algorithm.
//! SPAA 2004. <https://doi.org/10.1145/1007912.1007944>

use core::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use rand::Rng;

use super::Stack;
use crate::adt::ConcurrentStack;
use crate::Value;

/// Number of slots in the collision array.
pub const ELIM_SIZE: usize = 8;

// Collision slot states. A slot advertising `POP_WAITING` is claimed by a
// push, which then hands its value over through `vals`; `PUSH_WAITING` is
// the mirror image.
const IDLE: usize = 0;
const PUSH_WAITING: usize = 1;
const POP_WAITING: usize = 2;

#[inline]
fn random_slot() -> usize {
    rand::rng().random_range(0..ELIM_SIZE)
}

/// Treiber stack with an elimination collision array in front.
///
/// A push and a pop that meet in the same slot cancel each other without
/// touching `top`. The rendezvous is purely opportunistic: an operation
/// polls one random slot exactly once and otherwise falls through to the
/// lock-free stack immediately, so it never waits in the array.
#[derive(Debug, Default)]
pub struct ElimStack {
    inner: Stack,
    ops: [AtomicUsize; ELIM_SIZE],
    /// `vals[i]` is meaningful only around a claim of `ops[i]`.
    vals: [AtomicI64; ELIM_SIZE],
}

impl ElimStack {
    /// Creates a new, empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a value on top of the stack.
    pub fn push(&self, value: Value) {
        let slot = random_slot();

        // A pop waiting in this slot takes our value directly and the stack
        // itself is never touched.
        if self.ops[slot]
            .compare_exchange(POP_WAITING, IDLE, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.vals[slot].store(value, Ordering::Release);
            return;
        }

        self.inner.push(value);
    }

    /// Attempts to pop the top element from the stack.
    ///
    /// Returns `None` if the stack is empty; never blocks on emptiness.
    pub fn pop(&self) -> Option<Value> {
        let slot = random_slot();

        // A push waiting in this slot hands its value over directly.
        if self.ops[slot]
            .compare_exchange(PUSH_WAITING, IDLE, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return Some(self.vals[slot].load(Ordering::Acquire));
        }

        self.inner.pop()
    }

    /// Returns `true` if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ConcurrentStack for ElimStack {
    fn push(&self, value: Value) {
        ElimStack::push(self, value);
    }

    fn pop(&self) -> Option<Value> {
        ElimStack::pop(self)
    }
}

#[cfg(test)]
mod test {
    use std::thread::scope;

    use super::*;

    #[test]
    fn lifo_serial() {
        let stack = ElimStack::new();
        stack.push(1);
        stack.push(2);
        stack.push(3);
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn empty_on_start() {
        let stack = ElimStack::new();
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
    }

    /// Four threads each push a disjoint range and then pop as many values
    /// back. Every pop must find a value: a thread only starts popping once
    /// its own pushes are complete, so the stack can never run dry early.
    #[test]
    fn paired_threads_drain_exactly() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 5_000;

        let stack = ElimStack::new();

        let mut popped: Vec<Value> = scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    let stack = &stack;
                    scope.spawn(move || {
                        for i in 0..PER_THREAD {
                            stack.push((t * PER_THREAD + i) as Value);
                        }
                        (0..PER_THREAD)
                            .map(|_| stack.pop().expect("paired pop found the stack empty"))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        popped.sort_unstable();
        let expected: Vec<Value> = (0..(THREADS * PER_THREAD) as Value).collect();
        assert_eq!(popped, expected);
        assert!(stack.is_empty());
    }
}
