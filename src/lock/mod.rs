//! Locks.

mod api;
mod spinlock;

pub use api::{Lock, LockGuard, RawLock, RawTryLock};
pub use spinlock::SpinLock;
