//! Lock-free data structures.
//!
//! # Node retention
//!
//! A node unlinked by a successful `compare_exchange` is never freed while
//! the container is alive: a concurrent operation may still be reading it
//! through an older snapshot of `top`/`head`, and these containers carry no
//! hazard-pointer or epoch machinery to prove otherwise. Retired nodes are
//! simply leaked for the lifetime of the process; dropping a container
//! frees only the chain still reachable from it. This also means the CAS
//! loops are immune to ABA: an address observed twice is still the same
//! node, because retired nodes are never reused.

mod elim;
mod queue;
mod stack;

pub use elim::{ElimStack, ELIM_SIZE};
pub use queue::Queue;
pub use stack::Stack;
