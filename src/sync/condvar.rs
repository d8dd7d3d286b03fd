use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, MutexGuard};

/// A condition variable that filters spurious wakeups.
///
/// Every notification advances a generation counter; [`wait`] captures the
/// counter on entry and returns only once it has moved on. A wakeup of the
/// underlying primitive that was not caused by [`signal`] or [`broadcast`]
/// finds the generation unchanged and goes back to sleep.
///
/// The counter is read and advanced under the mutex of the guard passed to
/// [`wait`]: callers must hold that mutex when signalling, or signal right
/// after releasing it, as with any condition variable.
///
/// [`wait`]: EpochCondvar::wait
/// [`signal`]: EpochCondvar::signal
/// [`broadcast`]: EpochCondvar::broadcast
#[derive(Debug, Default)]
pub struct EpochCondvar {
    epoch: AtomicUsize,
    cv: Condvar,
}

impl EpochCondvar {
    /// Creates a new condition variable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the generation moves past the one observed on entry.
    ///
    /// Atomically releases the guard's mutex while sleeping and re-acquires
    /// it before returning.
    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        let epoch = self.epoch.load(Ordering::Relaxed);
        self.cv
            .wait_while(guard, |_| self.epoch.load(Ordering::Relaxed) == epoch)
            .unwrap()
    }

    /// Advances the generation and wakes one waiter.
    pub fn signal(&self) {
        let _ = self.epoch.fetch_add(1, Ordering::Relaxed);
        self.cv.notify_one();
    }

    /// Advances the generation and wakes every current waiter.
    pub fn broadcast(&self) {
        let _ = self.epoch.fetch_add(1, Ordering::Relaxed);
        self.cv.notify_all();
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;
    use std::thread::{scope, sleep};
    use std::time::Duration;

    use crossbeam_channel::{bounded, Receiver, Sender};

    use super::*;

    const WAITERS: usize = 3;

    /// Spins until all spawned waiters are asleep inside `wait`.
    ///
    /// Each waiter bumps the count under the mutex right before waiting, and
    /// `wait` releases the mutex only as it goes to sleep, so observing the
    /// full count under the mutex means every waiter is really parked.
    fn await_parked(state: &Mutex<usize>, n: usize) {
        loop {
            if *state.lock().unwrap() == n {
                return;
            }
            sleep(Duration::from_millis(1));
        }
    }

    fn spawn_waiter<'s, 'e: 's>(
        scope: &'s std::thread::Scope<'s, 'e>,
        state: &'e Mutex<usize>,
        cond: &'e EpochCondvar,
        woke: Sender<()>,
    ) {
        scope.spawn(move || {
            let mut guard = state.lock().unwrap();
            *guard += 1;
            let guard = cond.wait(guard);
            drop(guard);
            woke.send(()).unwrap();
        });
    }

    fn assert_no_wake(woke: &Receiver<()>) {
        assert!(woke.recv_timeout(Duration::from_millis(200)).is_err());
    }

    fn assert_one_wake(woke: &Receiver<()>) {
        woke.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn signal_wakes_exactly_one() {
        let state = Mutex::new(0);
        let cond = EpochCondvar::new();
        let (tx, rx) = bounded(WAITERS);

        scope(|s| {
            for _ in 0..WAITERS {
                spawn_waiter(s, &state, &cond, tx.clone());
            }
            await_parked(&state, WAITERS);

            cond.signal();
            assert_one_wake(&rx);
            assert_no_wake(&rx);

            // Release the remaining waiters so the scope can join.
            cond.broadcast();
            for _ in 0..WAITERS - 1 {
                assert_one_wake(&rx);
            }
        });
    }

    #[test]
    fn broadcast_wakes_all() {
        let state = Mutex::new(0);
        let cond = EpochCondvar::new();
        let (tx, rx) = bounded(WAITERS);

        scope(|s| {
            for _ in 0..WAITERS {
                spawn_waiter(s, &state, &cond, tx.clone());
            }
            await_parked(&state, WAITERS);

            cond.broadcast();
            for _ in 0..WAITERS {
                assert_one_wake(&rx);
            }
        });
    }

    /// A wakeup of the underlying condition variable without a generation
    /// change must not release the waiter.
    #[test]
    fn spurious_wakeup_is_filtered() {
        let state = Mutex::new(0);
        let cond = EpochCondvar::new();
        let (tx, rx) = bounded(1);

        scope(|s| {
            spawn_waiter(s, &state, &cond, tx);
            await_parked(&state, 1);

            // Poke the raw primitive directly, bypassing the generation
            // counter: this is exactly what a spurious wakeup looks like.
            cond.cv.notify_all();
            assert_no_wake(&rx);

            cond.signal();
            assert_one_wake(&rx);
        });
    }
}
