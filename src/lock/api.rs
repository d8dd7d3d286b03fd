use core::cell::UnsafeCell;
use core::fmt;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

/// Raw lock interface.
///
/// # Safety
///
/// Implementations must provide mutual exclusion: between a `lock()` and the
/// `unlock()` called with the token it returned, no other `lock()` may
/// return.
pub unsafe trait RawLock: Default + Send + Sync {
    /// Raw lock's token type.
    type Token;

    /// Acquires the raw lock.
    fn lock(&self) -> Self::Token;

    /// Releases the raw lock.
    ///
    /// # Safety
    ///
    /// `unlock()` should be called with the token given by the corresponding
    /// `lock()`.
    unsafe fn unlock(&self, token: Self::Token);
}

/// Raw lock interface for the try_lock API.
///
/// # Safety
///
/// Same conditions as [`RawLock`], with a successful `try_lock()` counting
/// as a `lock()`.
pub unsafe trait RawTryLock: RawLock {
    /// Tries to acquire the raw lock.
    fn try_lock(&self) -> Result<Self::Token, ()>;
}

/// A type-safe lock.
#[derive(Debug)]
pub struct Lock<L: RawLock, T> {
    lock: L,
    data: UnsafeCell<T>,
}

unsafe impl<L: RawLock, T: Send> Send for Lock<L, T> {}
unsafe impl<L: RawLock, T: Send> Sync for Lock<L, T> {}

impl<L: RawLock, T> Lock<L, T> {
    /// Creates a new lock.
    pub fn new(data: T) -> Self {
        Self {
            lock: L::default(),
            data: UnsafeCell::new(data),
        }
    }

    /// Destroys the lock and retrieves the lock-protected value.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// Acquires the lock and dereferences the inner value.
    pub fn lock(&self) -> LockGuard<'_, L, T> {
        let token = self.lock.lock();
        LockGuard {
            lock: self,
            token: ManuallyDrop::new(token),
        }
    }

    /// Dereferences the inner value.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// # Safety
    ///
    /// The underlying lock should be actually acquired.
    unsafe fn get_unchecked(&self) -> &T {
        // SAFETY: `UnsafeCell::get()` will not return a null pointer. Since
        // the lock is acquired, we have shared access to `data` for as long
        // as nobody mutates it through this reference's lifetime.
        unsafe { &*self.data.get() }
    }

    /// # Safety
    ///
    /// The underlying lock should be actually acquired.
    #[allow(clippy::mut_from_ref)]
    unsafe fn get_mut_unchecked(&self) -> &mut T {
        // SAFETY: `UnsafeCell::get()` will not return a null pointer. Since
        // the lock is acquired, we have unique access to `data`.
        unsafe { &mut *self.data.get() }
    }
}

impl<L: RawTryLock, T> Lock<L, T> {
    /// Tries to acquire the lock and dereferences the inner value.
    pub fn try_lock(&self) -> Result<LockGuard<'_, L, T>, ()> {
        self.lock.try_lock().map(|token| LockGuard {
            lock: self,
            token: ManuallyDrop::new(token),
        })
    }
}

/// A guard that holds the lock and dereferences the inner value.
pub struct LockGuard<'s, L: RawLock, T> {
    lock: &'s Lock<L, T>,
    token: ManuallyDrop<L::Token>,
}

impl<'s, L: RawLock, T> fmt::Debug for LockGuard<'s, L, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard").finish_non_exhaustive()
    }
}

unsafe impl<'s, L: RawLock, T: Send> Send for LockGuard<'s, L, T> {}
unsafe impl<'s, L: RawLock, T: Sync> Sync for LockGuard<'s, L, T> {}

impl<'s, L: RawLock, T> Drop for LockGuard<'s, L, T> {
    fn drop(&mut self) {
        // SAFETY: `self.token` is not used again: we are `drop`ing `self`.
        let token = unsafe { ManuallyDrop::take(&mut self.token) };

        // SAFETY: `self` was created with the token of the corresponding
        // `lock()`, so the token handed to `unlock()` is the right one.
        unsafe { self.lock.lock.unlock(token) };
    }
}

impl<'s, L: RawLock, T> Deref for LockGuard<'s, L, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // SAFETY: Having a `LockGuard` means the underlying lock is held.
        unsafe { self.lock.get_unchecked() }
    }
}

impl<'s, L: RawLock, T> DerefMut for LockGuard<'s, L, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: Having a `LockGuard` means the underlying lock is held.
        unsafe { self.lock.get_mut_unchecked() }
    }
}

#[cfg(test)]
pub mod tests {
    use core::ops::Deref;

    use std::thread::scope;

    use super::{Lock, RawLock};

    pub fn smoke<L: RawLock>() {
        const LENGTH: usize = 1024;
        let d = Lock::<L, Vec<usize>>::new(vec![]);

        scope(|s| {
            for i in 1..LENGTH {
                let d = &d;
                s.spawn(move || {
                    let mut d = d.lock();
                    d.push(i);
                });
            }
        });

        let mut d = d.lock();
        d.sort();
        assert_eq!(d.deref(), &(1..LENGTH).collect::<Vec<usize>>());
    }
}
