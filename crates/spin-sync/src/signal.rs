//! Condition signal: wait until another thread says so
//!
//! A [`Signal`] tracks two counts:
//!
//! - `waiting`: threads registered in [`Signal::wait`]
//! - `signaled`: wake-up credits not yet consumed
//!
//! Both counts share one 32-bit atomic word (waiters in the high half,
//! credits in the low half). A waiter consumes a credit and unregisters in a
//! single compare-and-swap, and a notifier checks `signaled < waiting` and
//! adds a credit in a single compare-and-swap, so `signaled <= waiting`
//! always holds.
//!
//! Waiters poll for a credit, yielding between polls. Once the spin budget
//! from the [`SpinPolicy`] is exhausted they park on the state word with a
//! futex-style wait, and notifiers wake them only if some thread is parked.
//!
//! The signal owns no lock. [`Signal::wait`] takes the caller's guard,
//! releases it while waiting and reacquires the same lock before returning.
//!
//! # Example
//!
//! ```rust
//! use spin_sync::{Signal, SpinLock};
//! use std::thread;
//!
//! let ready = SpinLock::new(false);
//! let signal = Signal::new();
//!
//! thread::scope(|s| {
//!     s.spawn(|| {
//!         let guard = ready.lock();
//!         let guard = signal.wait_while(guard, |ready| !*ready);
//!         assert!(*guard);
//!     });
//!
//!     // Registration happens before the waiter releases the lock, so
//!     // notifying under the same lock cannot be missed.
//!     let mut guard = ready.lock();
//!     *guard = true;
//!     signal.signal();
//! });
//! ```

use crate::lock::{RawSpinLock, SpinLockGuard};
use crate::policy::SpinPolicy;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::trace;

/// One registered waiter in the packed state word
const ONE_WAITER: u32 = 1 << 16;
/// Low half of the state word: outstanding credits
const CREDIT_MASK: u32 = 0xFFFF;

/// Maximum number of threads that may be registered at once
pub const MAX_WAITERS: u32 = 0xFFFF;

const fn waiting(state: u32) -> u32 {
    state >> 16
}

const fn signaled(state: u32) -> u32 {
    state & CREDIT_MASK
}

/// A condition variable built from polled counters
pub struct Signal {
    /// `waiting << 16 | signaled`
    state: AtomicU32,
    /// Threads currently parked in the kernel on `state`
    sleepers: AtomicU32,
    policy: SpinPolicy,
}

impl Signal {
    /// Create a signal with no waiters and no credits
    #[must_use]
    pub const fn new() -> Self {
        Self::with_policy(SpinPolicy::new())
    }

    /// Create a signal whose waiters follow `policy`
    #[must_use]
    pub const fn with_policy(policy: SpinPolicy) -> Self {
        Self {
            state: AtomicU32::new(0),
            sleepers: AtomicU32::new(0),
            policy,
        }
    }

    /// Release `guard`, wait for a credit, then lock again
    ///
    /// The caller is registered as a waiter before the lock is released, so
    /// a notifier that takes the same lock after the caller entered `wait`
    /// cannot miss it.
    ///
    /// # Panics
    ///
    /// Panics if [`MAX_WAITERS`] threads are already registered.
    pub fn wait<'a, T>(&self, guard: SpinLockGuard<'a, T>) -> SpinLockGuard<'a, T> {
        let lock = SpinLockGuard::source(&guard);
        self.register();
        drop(guard);
        self.await_credit();
        lock.lock()
    }

    /// Wait as long as `condition` holds for the guarded data
    ///
    /// Returns with the lock held and `condition` false.
    pub fn wait_while<'a, T, F>(
        &self,
        mut guard: SpinLockGuard<'a, T>,
        mut condition: F,
    ) -> SpinLockGuard<'a, T>
    where
        F: FnMut(&mut T) -> bool,
    {
        while condition(&mut *guard) {
            guard = self.wait(guard);
        }
        guard
    }

    /// Like [`wait`](Self::wait) for a bare flag the caller has acquired
    ///
    /// `lock` must be held by the caller on entry; it is held again on return.
    ///
    /// # Panics
    ///
    /// Panics if [`MAX_WAITERS`] threads are already registered.
    pub fn wait_raw(&self, lock: &RawSpinLock) {
        self.register();
        lock.release();
        self.await_credit();
        lock.acquire();
    }

    /// Wake one registered waiter
    ///
    /// Does nothing when no thread is registered, or when every registered
    /// thread already has a credit waiting for it.
    pub fn signal(&self) {
        let added = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |state| {
                (signaled(state) < waiting(state)).then_some(state + 1)
            })
            .is_ok();

        if added && self.sleepers.load(Ordering::SeqCst) > 0 {
            trace!("waking one parked signal waiter");
            atomic_wait::wake_one(&self.state);
        }
    }

    /// Wake every registered waiter
    pub fn broadcast(&self) {
        let added = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |state| {
                (signaled(state) < waiting(state))
                    .then_some((state & !CREDIT_MASK) | waiting(state))
            })
            .is_ok();

        if added && self.sleepers.load(Ordering::SeqCst) > 0 {
            trace!("waking all parked signal waiters");
            atomic_wait::wake_all(&self.state);
        }
    }

    /// Number of registered waiters (snapshot)
    #[must_use]
    pub fn waiters(&self) -> usize {
        waiting(self.state.load(Ordering::SeqCst)) as usize
    }

    /// Number of credits not yet consumed (snapshot)
    #[must_use]
    pub fn pending(&self) -> usize {
        signaled(self.state.load(Ordering::SeqCst)) as usize
    }

    /// The policy waiters follow
    #[must_use]
    pub const fn policy(&self) -> SpinPolicy {
        self.policy
    }

    fn register(&self) {
        let registered = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |state| {
                (waiting(state) < MAX_WAITERS).then_some(state + ONE_WAITER)
            });
        assert!(
            registered.is_ok(),
            "Signal supports at most {MAX_WAITERS} concurrent waiters"
        );
    }

    /// Consume one credit and unregister, if a credit is available
    fn try_take_credit(&self) -> bool {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |state| {
                (signaled(state) > 0).then_some(state - ONE_WAITER - 1)
            })
            .is_ok()
    }

    fn await_credit(&self) {
        let mut backoff = self.policy.backoff();
        loop {
            if self.try_take_credit() {
                return;
            }
            if backoff.should_park() {
                self.park();
                backoff.reset();
            } else {
                backoff.poll();
            }
        }
    }

    /// Sleep on the state word until it changes
    ///
    /// `sleepers` is raised before the state is re-read, so a notifier
    /// either sees this thread as parked or this thread sees its credit.
    fn park(&self) {
        self.sleepers.fetch_add(1, Ordering::SeqCst);
        let observed = self.state.load(Ordering::SeqCst);
        if signaled(observed) == 0 {
            trace!(waiters = waiting(observed), "parking signal waiter");
            atomic_wait::wait(&self.state, observed);
        }
        self.sleepers.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.load(Ordering::SeqCst);
        f.debug_struct("Signal")
            .field("waiting", &waiting(state))
            .field("signaled", &signaled(state))
            .field("parked", &self.sleepers.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::SpinLock;
    use std::thread;

    fn wait_for(mut ready: impl FnMut() -> bool) {
        while !ready() {
            thread::yield_now();
        }
    }

    #[test]
    fn test_state_packing() {
        let state = 3 * ONE_WAITER + 2;
        assert_eq!(waiting(state), 3);
        assert_eq!(signaled(state), 2);
    }

    #[test]
    fn test_signal_without_waiters_is_noop() {
        let signal = Signal::new();
        signal.signal();
        signal.broadcast();
        assert_eq!(signal.waiters(), 0);
        assert_eq!(signal.pending(), 0);
    }

    #[test]
    fn test_signal_wakes_registered_waiter() {
        let lock = SpinLock::new(0);
        let signal = Signal::new();

        thread::scope(|s| {
            let waiter = s.spawn(|| {
                let guard = lock.lock();
                let mut guard = signal.wait(guard);
                *guard += 1;
            });

            wait_for(|| signal.waiters() == 1);
            signal.signal();
            // Credits never exceed registered waiters
            signal.signal();
            waiter.join().unwrap();
        });

        assert_eq!(lock.into_inner(), 1);
        assert_eq!(signal.waiters(), 0);
        assert_eq!(signal.pending(), 0);
    }

    #[test]
    fn test_credits_capped_by_waiters() {
        let signal = Signal::new();
        signal.register();
        signal.register();
        signal.signal();
        signal.signal();
        signal.signal();
        assert_eq!(signal.waiters(), 2);
        assert_eq!(signal.pending(), 2);

        assert!(signal.try_take_credit());
        assert_eq!(signal.waiters(), 1);
        assert_eq!(signal.pending(), 1);
    }

    #[test]
    fn test_broadcast_sets_credits_to_waiters() {
        let signal = Signal::new();
        for _ in 0..5 {
            signal.register();
        }
        signal.signal();
        signal.broadcast();
        assert_eq!(signal.pending(), 5);
    }

    #[test]
    fn test_parked_waiter_is_woken() {
        let lock = SpinLock::new(());
        let signal = Signal::with_policy(SpinPolicy::new().with_spin_limit(Some(0)));

        thread::scope(|s| {
            let waiter = s.spawn(|| {
                let guard = lock.lock();
                drop(signal.wait(guard));
            });

            wait_for(|| signal.sleepers.load(Ordering::SeqCst) == 1);
            signal.signal();
            waiter.join().unwrap();
        });

        assert_eq!(signal.waiters(), 0);
    }

    #[test]
    fn test_wait_raw_reacquires_lock() {
        let lock = RawSpinLock::new();
        let signal = Signal::new();

        thread::scope(|s| {
            let waiter = s.spawn(|| {
                lock.acquire();
                signal.wait_raw(&lock);
                let held = lock.is_locked();
                lock.release();
                held
            });

            wait_for(|| signal.waiters() == 1);
            lock.acquire();
            signal.signal();
            lock.release();
            assert!(waiter.join().unwrap());
        });
    }

    #[test]
    #[should_panic(expected = "concurrent waiters")]
    fn test_register_overflow_panics() {
        let signal = Signal::new();
        signal.state.store(MAX_WAITERS * ONE_WAITER, Ordering::SeqCst);
        signal.register();
    }
}
