//! Spin and park tuning shared by every primitive in this crate
//!
//! A [`SpinPolicy`] is a small `Copy` value handed to a primitive at
//! construction. It controls two things:
//!
//! - how many times a contended lock yields the processor between
//!   test-and-set attempts, and
//! - how many polls a [`Signal`](crate::Signal) waiter performs before it
//!   stops spinning and parks in the kernel.
//!
//! # Example
//!
//! ```rust
//! use spin_sync::{Counter, SpinPolicy};
//!
//! // Short critical sections, waiters that park quickly
//! let policy = SpinPolicy::new().with_yields_per_retry(4).with_spin_limit(Some(16));
//! let counter = Counter::with_policy(1, policy);
//! counter.wait();
//! counter.signal();
//! ```

use std::thread;

/// Default number of yields between failed lock attempts
pub const DEFAULT_YIELDS_PER_RETRY: u32 = 10;

/// Default number of polls a waiter spins before parking
pub const DEFAULT_SPIN_LIMIT: u32 = 100;

/// Tuning for spin-and-yield loops
///
/// The default policy yields [`DEFAULT_YIELDS_PER_RETRY`] times per failed
/// lock attempt and lets signal waiters poll [`DEFAULT_SPIN_LIMIT`] times
/// before parking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinPolicy {
    yields_per_retry: u32,
    spin_limit: Option<u32>,
}

impl SpinPolicy {
    /// Create the default policy
    ///
    /// # Example
    ///
    /// ```rust
    /// use spin_sync::SpinPolicy;
    ///
    /// let policy = SpinPolicy::new();
    /// assert_eq!(policy.yields_per_retry(), 10);
    /// assert_eq!(policy.spin_limit(), Some(100));
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self {
            yields_per_retry: DEFAULT_YIELDS_PER_RETRY,
            spin_limit: Some(DEFAULT_SPIN_LIMIT),
        }
    }

    /// A policy whose waiters never park
    ///
    /// Every wait burns CPU until it is satisfied. Useful when waits are
    /// known to be very short, or to measure the pure busy-wait cost.
    #[must_use]
    pub const fn spin_only() -> Self {
        Self {
            yields_per_retry: DEFAULT_YIELDS_PER_RETRY,
            spin_limit: None,
        }
    }

    /// Set the number of yields between failed lock attempts
    ///
    /// Zero means retry immediately with only a spin-loop hint.
    #[must_use]
    pub const fn with_yields_per_retry(mut self, yields: u32) -> Self {
        self.yields_per_retry = yields;
        self
    }

    /// Set the number of polls before a waiter parks
    ///
    /// `Some(0)` parks on the first unsuccessful poll, `None` never parks.
    #[must_use]
    pub const fn with_spin_limit(mut self, limit: Option<u32>) -> Self {
        self.spin_limit = limit;
        self
    }

    /// Yields performed between failed lock attempts
    #[must_use]
    pub const fn yields_per_retry(&self) -> u32 {
        self.yields_per_retry
    }

    /// Polls performed before parking, `None` if waiters never park
    #[must_use]
    pub const fn spin_limit(&self) -> Option<u32> {
        self.spin_limit
    }

    /// Start a fresh backoff for one wait
    #[must_use]
    pub const fn backoff(&self) -> Backoff {
        Backoff {
            policy: *self,
            polls: 0,
        }
    }
}

impl Default for SpinPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-wait spin state
///
/// Created by [`SpinPolicy::backoff`] at the start of each wait and dropped
/// when the wait finishes.
#[derive(Debug)]
pub struct Backoff {
    policy: SpinPolicy,
    polls: u32,
}

impl Backoff {
    /// Yield the processor for one burst
    ///
    /// This is the fixed-size burst a contended lock performs between
    /// test-and-set attempts.
    pub fn snooze(&self) {
        if self.policy.yields_per_retry == 0 {
            std::hint::spin_loop();
            return;
        }
        for _ in 0..self.policy.yields_per_retry {
            thread::yield_now();
        }
    }

    /// Record one unsuccessful poll and yield once
    pub fn poll(&mut self) {
        self.polls = self.polls.saturating_add(1);
        thread::yield_now();
    }

    /// Whether the spin budget has been used up
    #[must_use]
    pub fn should_park(&self) -> bool {
        self.policy
            .spin_limit
            .is_some_and(|limit| self.polls >= limit)
    }

    /// Start spinning again after a wake-up
    pub fn reset(&mut self) {
        self.polls = 0;
    }
}
