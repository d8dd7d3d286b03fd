use core::mem;
use core::sync::atomic::Ordering;

use crossbeam_epoch::{pin, Atomic, Owned};

use crate::adt::ConcurrentStack;
use crate::Value;

/// Treiber's lock-free stack.
///
/// Usable with any number of producers and consumers. The only mutable
/// shared cell is `top`; both operations are a snapshot-then-CAS loop on
/// it. Popped nodes are retained, not freed (see the [module
/// documentation](crate::lockfree)).
#[derive(Debug, Default)]
pub struct Stack {
    top: Atomic<Node>,
}

#[derive(Debug)]
struct Node {
    value: Value,
    /// Immutable once the node is linked.
    next: Atomic<Node>,
}

impl Stack {
    /// Creates a new, empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a value on top of the stack.
    pub fn push(&self, value: Value) {
        let mut n = Owned::new(Node {
            value,
            next: Atomic::null(),
        });

        let guard = pin();

        loop {
            let top = self.top.load(Ordering::Relaxed, &guard);
            n.next.store(top, Ordering::Relaxed);

            // Release so that whoever pops `n` sees its initialized fields.
            match self
                .top
                .compare_exchange(top, n, Ordering::Release, Ordering::Relaxed, &guard)
            {
                Ok(_) => break,
                Err(e) => n = e.new,
            }
        }
    }

    /// Attempts to pop the top element from the stack.
    ///
    /// Returns `None` if the stack is empty; never blocks on emptiness.
    pub fn pop(&self) -> Option<Value> {
        let guard = pin();
        loop {
            let top = self.top.load(Ordering::Acquire, &guard);
            let t = unsafe { top.as_ref() }?;
            let next = t.next.load(Ordering::Relaxed, &guard);

            if self
                .top
                .compare_exchange(top, next, Ordering::Relaxed, Ordering::Relaxed, &guard)
                .is_ok()
            {
                // `top` is now unlinked but stays allocated: a concurrent
                // `pop` may still read `t.next` through its own snapshot.
                return Some(t.value);
            }
        }
    }

    /// Returns `true` if the stack is empty.
    pub fn is_empty(&self) -> bool {
        let guard = pin();
        self.top.load(Ordering::Acquire, &guard).is_null()
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        // Walk and free the chain still linked; `&mut self` guarantees no
        // concurrent snapshot exists anymore.
        let mut curr = mem::take(&mut self.top);

        // SAFETY: every node in the chain was made in `push()` and is not
        // reachable from anywhere else.
        while let Some(node) = unsafe { curr.try_into_owned() }.map(Owned::into_box) {
            curr = node.next;
        }
    }
}

impl ConcurrentStack for Stack {
    fn push(&self, value: Value) {
        Stack::push(self, value);
    }

    fn pop(&self) -> Option<Value> {
        Stack::pop(self)
    }
}
