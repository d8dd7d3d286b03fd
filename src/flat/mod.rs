//! Flat-combining containers.
//!
//! Hendler, Incze, Shavit, and Tzafrir. Flat Combining and the
//! Synchronization-Parallelism Tradeoff. SPAA 2010.
//! <https://doi.org/10.1145/1810479.1810540>
//!
//! Instead of contending on the data structure, every thread publishes its
//! request in a private slot and one thread at a time, the *combiner*,
//! executes all published requests against a plain sequential container
//! under a single lock. Everyone else spins on its own slot until served.

use core::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

use crate::lock::{Lock, SpinLock};
use crate::Value;

mod queue;
mod stack;

pub use queue::Queue;
pub use stack::Stack;

/// Number of request slots per container.
///
/// Threads are mapped onto slots by a global counter modulo `MAX_THREADS`,
/// so a process running more threads than this wraps around and makes them
/// share slots; sharing threads must not operate on the same container
/// concurrently.
pub const MAX_THREADS: usize = 32;

// Request states published in `Slot::op`.
const IDLE: usize = 0;
const INSERT: usize = 1;
const REMOVE: usize = 2;

static NEXT_THREAD: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// Latched on first use and stable for the thread's lifetime; the same
    /// index is used for every flat-combining container.
    static SLOT_INDEX: usize = NEXT_THREAD.fetch_add(1, Ordering::Relaxed) % MAX_THREADS;
}

#[inline]
fn slot_index() -> usize {
    SLOT_INDEX.with(|i| *i)
}

/// Sequential containers a combiner can drive.
pub(crate) trait Sequential: Default {
    /// Adds a value.
    fn insert(&mut self, value: Value);

    /// Removes a value, or reports the container empty.
    fn remove(&mut self) -> Option<Value>;
}

/// One thread's request slot.
///
/// A slot cycles idle → posted → served → idle: the owner writes `val`,
/// clears `missing` and `done`, and publishes `op`; the combiner executes
/// the request, fills in `result` or `missing`, and raises `done`; the
/// owner then retires the request by resetting `op`.
#[derive(Debug, Default)]
struct Slot {
    op: AtomicUsize,
    val: AtomicI64,
    result: AtomicI64,
    /// Raised instead of `result` when a removal found the container empty.
    missing: AtomicBool,
    done: AtomicBool,
}

/// The request slots plus the combiner-locked sequential container.
#[derive(Debug)]
pub(crate) struct Core<S: Sequential> {
    data: Lock<SpinLock, S>,
    slots: [CachePadded<Slot>; MAX_THREADS],
}

impl<S: Sequential> Default for Core<S> {
    fn default() -> Self {
        Self {
            data: Lock::new(S::default()),
            slots: Default::default(),
        }
    }
}

impl<S: Sequential> Core<S> {
    pub(crate) fn insert(&self, value: Value) {
        self.run(INSERT, value);
    }

    pub(crate) fn remove(&self) -> Option<Value> {
        self.run(REMOVE, 0)
    }

    /// Publishes a request in this thread's slot and waits until some
    /// combiner, possibly this very thread, has served it.
    fn run(&self, op: usize, val: Value) -> Option<Value> {
        let slot = &*self.slots[slot_index()];
        if op == INSERT {
            slot.val.store(val, Ordering::Relaxed);
        }
        slot.missing.store(false, Ordering::Relaxed);
        // Release on both stores below: a combiner may notice the new
        // request through either `op` or `done` (consecutive requests store
        // the same `op` value), and must see `val` and `missing` whichever
        // way it got here.
        slot.done.store(false, Ordering::Release);
        slot.op.store(op, Ordering::Release);

        // Whoever wins the lock combines on behalf of everyone. Losers spin
        // on their own slot, re-bidding for the lock each round: the current
        // combiner may have passed our slot before we published.
        let backoff = Backoff::new();
        while !slot.done.load(Ordering::Acquire) {
            if let Ok(mut data) = self.data.try_lock() {
                Self::combine(&mut data, &self.slots);
            } else {
                backoff.snooze();
            }
        }
        slot.op.store(IDLE, Ordering::Relaxed);

        if op == REMOVE && !slot.missing.load(Ordering::Relaxed) {
            Some(slot.result.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    /// Serves every pending request in slot order. Runs under the lock.
    fn combine(data: &mut S, slots: &[CachePadded<Slot>; MAX_THREADS]) {
        for slot in slots.iter() {
            // A raised `done` is a request some previous combiner already
            // served and whose owner has not retired it yet. `done` is read
            // before `op`: the owner lowers `done` before publishing `op`,
            // so an `op` read here is never from an older request than the
            // `done` just observed.
            if slot.done.load(Ordering::Acquire) {
                continue;
            }
            let op = slot.op.load(Ordering::Acquire);
            if op == IDLE {
                continue;
            }

            if op == INSERT {
                data.insert(slot.val.load(Ordering::Relaxed));
            } else {
                match data.remove() {
                    Some(v) => slot.result.store(v, Ordering::Relaxed),
                    None => slot.missing.store(true, Ordering::Relaxed),
                }
            }
            // Release: the owner's acquire load of `done` makes `result`
            // and `missing` visible to it.
            slot.done.store(true, Ordering::Release);
        }
    }
}
