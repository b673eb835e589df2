//! Counting semaphore built from [`SpinLock`] and [`Signal`]
//!
//! The count is a plain `usize` inside a [`SpinLock`], and the only way to
//! reach it is through the lock's guard. [`Counter::wait`] holds that guard
//! while it checks the count and hands it to [`Signal::wait`] while the count
//! is zero, so every update to the count is serialized by the same lock.
//!
//! # Example
//!
//! ```rust
//! use spin_sync::Counter;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::thread;
//!
//! // At most two workers inside at a time
//! let counter = Counter::new(2);
//! let inside = AtomicUsize::new(0);
//! let peak = AtomicUsize::new(0);
//!
//! thread::scope(|s| {
//!     for _ in 0..4 {
//!         s.spawn(|| {
//!             for _ in 0..100 {
//!                 let _permit = counter.acquire();
//!                 let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
//!                 peak.fetch_max(now, Ordering::SeqCst);
//!                 inside.fetch_sub(1, Ordering::SeqCst);
//!             }
//!         });
//!     }
//! });
//! assert!(peak.load(Ordering::SeqCst) <= 2);
//! assert_eq!(counter.available(), 2);
//! ```

use crate::lock::SpinLock;
use crate::policy::SpinPolicy;
use crate::signal::Signal;
use std::fmt;

/// A counting semaphore
///
/// The counter holds a number of units. [`wait`](Self::wait) takes one,
/// spinning (and eventually parking) while none are left;
/// [`signal`](Self::signal) returns one and wakes a waiter if there is any.
///
/// # Design
///
/// - **Lock-guarded count**: the count lives inside a [`SpinLock`]
/// - **Signal for waiters**: exhausted callers wait on a [`Signal`] with that lock
/// - **RAII permits**: [`CounterPermit`] signals on drop
/// - **No fairness**: any waiter may take a freed unit
pub struct Counter {
    /// Units currently available
    count: SpinLock<usize>,
    /// Waiters for a unit to become available
    available: Signal,
}

impl Counter {
    /// Create a counter holding `initial` units
    ///
    /// # Example
    ///
    /// ```rust
    /// use spin_sync::Counter;
    ///
    /// let counter = Counter::new(3);
    /// assert_eq!(counter.available(), 3);
    /// ```
    #[must_use]
    pub const fn new(initial: usize) -> Self {
        Self::with_policy(initial, SpinPolicy::new())
    }

    /// Create a counter holding `initial` units using `policy`
    #[must_use]
    pub const fn with_policy(initial: usize, policy: SpinPolicy) -> Self {
        Self {
            count: SpinLock::with_policy(initial, policy),
            available: Signal::with_policy(policy),
        }
    }

    /// Take one unit, waiting until one is available
    pub fn wait(&self) {
        let count = self.count.lock();
        let mut count = self.available.wait_while(count, |count| *count == 0);
        *count -= 1;
    }

    /// Take one unit if one is available right now
    ///
    /// # Example
    ///
    /// ```rust
    /// use spin_sync::Counter;
    ///
    /// let counter = Counter::new(1);
    /// assert!(counter.try_wait());
    /// assert!(!counter.try_wait());
    /// ```
    #[must_use]
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.lock();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Return one unit and wake one waiter
    ///
    /// # Panics
    ///
    /// Panics if the count would overflow `usize`.
    pub fn signal(&self) {
        self.signal_n(1);
    }

    /// Return `n` units and wake up to `n` waiters
    ///
    /// # Panics
    ///
    /// Panics if the count would overflow `usize`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use spin_sync::Counter;
    ///
    /// let counter = Counter::new(0);
    /// counter.signal_n(3);
    /// assert_eq!(counter.available(), 3);
    /// ```
    pub fn signal_n(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut count = self.count.lock();
        *count = count
            .checked_add(n)
            .unwrap_or_else(|| panic!("Counter overflow adding {n} units"));
        for _ in 0..n.min(self.available.waiters()) {
            self.available.signal();
        }
    }

    /// Take one unit and hold it until the returned permit is dropped
    ///
    /// # Example
    ///
    /// ```rust
    /// use spin_sync::Counter;
    ///
    /// let counter = Counter::new(2);
    /// {
    ///     let _permit = counter.acquire();
    ///     assert_eq!(counter.available(), 1);
    /// }
    /// assert_eq!(counter.available(), 2);
    /// ```
    pub fn acquire(&self) -> CounterPermit<'_> {
        self.wait();
        CounterPermit { counter: self }
    }

    /// Take one unit as a permit if one is available right now
    #[must_use]
    pub fn try_acquire(&self) -> Option<CounterPermit<'_>> {
        self.try_wait().then(|| CounterPermit { counter: self })
    }

    /// Units currently available (snapshot)
    #[must_use]
    pub fn available(&self) -> usize {
        *self.count.lock()
    }

    /// Threads currently waiting for a unit (snapshot)
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.available.waiters()
    }

    /// The policy this counter was built with
    #[must_use]
    pub const fn policy(&self) -> SpinPolicy {
        self.count.policy()
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("count", &self.count)
            .field("waiters", &self.available.waiters())
            .finish()
    }
}

/// RAII guard that returns a unit to its [`Counter`] on drop
///
/// Returned by [`Counter::acquire`] and [`Counter::try_acquire`].
#[must_use = "dropping the permit immediately returns the unit"]
pub struct CounterPermit<'a> {
    counter: &'a Counter,
}

impl CounterPermit<'_> {
    /// Keep the unit: the counter stays one lower for good
    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl Drop for CounterPermit<'_> {
    fn drop(&mut self) {
        self.counter.signal();
    }
}

impl fmt::Debug for CounterPermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterPermit").finish_non_exhaustive()
    }
}
