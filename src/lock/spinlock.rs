use core::sync::atomic::AtomicBool;
use core::sync::atomic::Ordering::*;

use crossbeam_utils::Backoff;

use crate::lock::*;

/// A test-and-set spin lock with exponential backoff.
#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

unsafe impl RawLock for SpinLock {
    type Token = ();

    fn lock(&self) {
        let backoff = Backoff::new();

        while self.try_lock().is_err() {
            backoff.snooze();
        }
    }

    unsafe fn unlock(&self, _token: ()) {
        self.locked.store(false, Release);
    }
}

unsafe impl RawTryLock for SpinLock {
    fn try_lock(&self) -> Result<(), ()> {
        self.locked
            .compare_exchange(false, true, Acquire, Relaxed)
            .map(|_| ())
            .map_err(|_| ())
    }
}
