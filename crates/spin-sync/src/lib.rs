//! Spin-then-park synchronization primitives for threads
//!
//! This crate provides a small set of user-space primitives meant as a
//! lightweight substitute for the platform's mutex, condition variable and
//! semaphore. Each layer is built on the one before it:
//!
//! - [`RawSpinLock`] / [`SpinLock`] - test-and-set lock with yield backoff
//! - [`Signal`] - condition variable from polled waiter/credit counters
//! - [`Counter`] - counting semaphore composed of a [`SpinLock`] and a [`Signal`]
//!
//! Locks only ever spin and yield. Signal waiters spin for a bounded number
//! of polls and then park in the kernel until a notifier wakes them; the
//! budget is set per primitive with a [`SpinPolicy`].
//!
//! There is no fairness between waiters, no reentrancy and no timed wait.
//!
//! # Example
//!
//! ```rust
//! use spin_sync::Counter;
//! use std::thread;
//!
//! let jobs = Counter::new(0);
//!
//! thread::scope(|s| {
//!     let consumer = s.spawn(|| {
//!         for _ in 0..10 {
//!             jobs.wait();
//!         }
//!     });
//!     for _ in 0..10 {
//!         jobs.signal();
//!     }
//!     consumer.join().unwrap();
//! });
//! assert_eq!(jobs.available(), 0);
//! ```

mod counter;
mod lock;
mod policy;
mod signal;

pub use counter::{Counter, CounterPermit};
pub use lock::{RawSpinLock, SpinLock, SpinLockGuard};
pub use policy::{Backoff, SpinPolicy, DEFAULT_SPIN_LIMIT, DEFAULT_YIELDS_PER_RETRY};
pub use signal::{Signal, MAX_WAITERS};
