//! Concurrent stacks and queues under different synchronization disciplines.
//!
//! Seven containers over a fixed integer element type, one discipline each:
//! a single global lock ([`locked`]), lock-free compare-and-swap
//! ([`lockfree::Stack`], [`lockfree::Queue`]), elimination back-off
//! ([`lockfree::ElimStack`]), and flat combining ([`flat`]). The [`sync`]
//! module adds a bounded blocking queue built on a condition variable that
//! filters spurious wakeups with a generation counter.
//!
//! Every container is linearizable and usable with any number of producers
//! and consumers. Non-blocking containers report an empty container as
//! `None`; the bounded queue suspends instead.

#![warn(missing_docs, missing_debug_implementations)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod adt;
pub mod flat;
pub mod lock;
pub mod locked;
pub mod lockfree;
pub mod sync;

/// Element type carried by every container in this crate.
pub type Value = i64;
