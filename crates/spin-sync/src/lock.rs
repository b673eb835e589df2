//! Test-and-set spinlock
//!
//! Two layers are provided:
//!
//! - [`RawSpinLock`] is the bare flag with explicit `acquire`/`release`. It
//!   protects nothing by itself; the caller decides what it guards.
//! - [`SpinLock<T>`] pairs the flag with the data it protects and hands out a
//!   [`SpinLockGuard`] that releases on drop.
//!
//! Acquisition never sleeps in the kernel. A failed test-and-set is followed
//! by a fixed burst of yields (see [`SpinPolicy::yields_per_retry`]) and then
//! another attempt. The lock is not reentrant: acquiring it twice on the same
//! thread spins forever.
//!
//! # Example
//!
//! ```rust
//! use spin_sync::SpinLock;
//! use std::thread;
//!
//! let total = SpinLock::new(0u64);
//! thread::scope(|s| {
//!     for _ in 0..4 {
//!         s.spawn(|| {
//!             for _ in 0..1000 {
//!                 *total.lock() += 1;
//!             }
//!         });
//!     }
//! });
//! assert_eq!(total.into_inner(), 4000);
//! ```

use crate::policy::SpinPolicy;
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

/// A bare spinlock flag
///
/// `acquire` and `release` must be paired by the caller. Releasing a lock
/// that is not held does not corrupt the flag, but it breaks whatever
/// exclusion the caller was relying on.
pub struct RawSpinLock {
    /// `true` while some thread holds the lock
    locked: AtomicBool,
    /// Backoff between failed attempts
    policy: SpinPolicy,
}

impl RawSpinLock {
    /// Create an unlocked flag with the default policy
    #[must_use]
    pub const fn new() -> Self {
        Self::with_policy(SpinPolicy::new())
    }

    /// Create an unlocked flag with the given policy
    #[must_use]
    pub const fn with_policy(policy: SpinPolicy) -> Self {
        Self {
            locked: AtomicBool::new(false),
            policy,
        }
    }

    /// Spin until the lock is held by the caller
    ///
    /// # Example
    ///
    /// ```rust
    /// use spin_sync::RawSpinLock;
    ///
    /// let lock = RawSpinLock::new();
    /// lock.acquire();
    /// assert!(lock.is_locked());
    /// lock.release();
    /// assert!(!lock.is_locked());
    /// ```
    pub fn acquire(&self) {
        let backoff = self.policy.backoff();
        while self.locked.swap(true, Ordering::Acquire) {
            backoff.snooze();
        }
    }

    /// Try once to take the lock
    ///
    /// Returns `true` if the caller now holds it.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        !self.locked.swap(true, Ordering::Acquire)
    }

    /// Release the lock
    ///
    /// Writes made while holding the lock become visible to the next thread
    /// whose `acquire` succeeds.
    pub fn release(&self) {
        self.locked.store(false, Ordering::Release);
    }

    /// Whether some thread holds the lock right now
    ///
    /// The answer may be stale by the time the caller looks at it.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// The policy this lock was built with
    #[must_use]
    pub const fn policy(&self) -> SpinPolicy {
        self.policy
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawSpinLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSpinLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// A spinlock that owns the data it protects
pub struct SpinLock<T> {
    raw: RawSpinLock,
    data: UnsafeCell<T>,
}

// The flag serializes every access to `data`, so sharing the lock only needs
// the data to be movable between threads.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Create an unlocked lock around `value`
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self::with_policy(value, SpinPolicy::new())
    }

    /// Create an unlocked lock around `value` using `policy`
    #[must_use]
    pub const fn with_policy(value: T, policy: SpinPolicy) -> Self {
        Self {
            raw: RawSpinLock::with_policy(policy),
            data: UnsafeCell::new(value),
        }
    }

    /// Spin until the lock is held, returning a guard
    ///
    /// The lock is released when the guard is dropped.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        self.raw.acquire();
        SpinLockGuard::new(self)
    }

    /// Take the lock if it is free
    ///
    /// # Example
    ///
    /// ```rust
    /// use spin_sync::SpinLock;
    ///
    /// let lock = SpinLock::new(5);
    /// let guard = lock.try_lock();
    /// assert!(guard.is_some());
    /// assert!(lock.try_lock().is_none());
    /// ```
    #[must_use]
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.raw.try_acquire().then(|| SpinLockGuard::new(self))
    }

    /// Whether some thread holds the lock right now
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Mutable access without locking; the borrow proves exclusivity
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    /// Consume the lock and return the data
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    /// The policy this lock was built with
    #[must_use]
    pub const fn policy(&self) -> SpinPolicy {
        self.raw.policy()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("SpinLock");
        match self.try_lock() {
            Some(guard) => d.field("data", &&*guard),
            None => d.field("data", &format_args!("<locked>")),
        };
        d.finish_non_exhaustive()
    }
}

/// RAII guard returned by [`SpinLock::lock`]
///
/// Dereferences to the protected data and releases the lock on drop.
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    // Keeps the guard `Sync` only when `T: Sync`.
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> SpinLockGuard<'a, T> {
    const fn new(lock: &'a SpinLock<T>) -> Self {
        Self {
            lock,
            _marker: PhantomData,
        }
    }

    /// The lock this guard was taken from
    ///
    /// Used by [`Signal`](crate::Signal) to reacquire the same lock after a
    /// wait.
    pub(crate) const fn source(guard: &Self) -> &'a SpinLock<T> {
        guard.lock
    }
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard exists only while the flag is held.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard exists only while the flag is held.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.raw.release();
    }
}

impl<T: fmt::Debug> fmt::Debug for SpinLockGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_raw_lock_starts_clear() {
        let lock = RawSpinLock::new();
        assert!(!lock.is_locked());
        assert!(lock.try_acquire());
        assert!(lock.is_locked());
        assert!(!lock.try_acquire());
        lock.release();
        assert!(lock.try_acquire());
        lock.release();
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = SpinLock::new(Vec::new());
        {
            let mut guard = lock.lock();
            guard.push(1);
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
        assert_eq!(*lock.lock(), vec![1]);
    }

    #[test]
    fn test_try_lock_fails_while_held() {
        let lock = SpinLock::new(0);
        let guard = lock.lock();
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn test_get_mut_and_into_inner() {
        let mut lock = SpinLock::new(String::from("a"));
        lock.get_mut().push('b');
        assert_eq!(lock.into_inner(), "ab");
    }

    #[test]
    fn test_debug_shows_locked_state() {
        let lock = SpinLock::new(7);
        assert!(format!("{lock:?}").contains('7'));
        let _guard = lock.lock();
        assert!(format!("{lock:?}").contains("<locked>"));
    }

    #[test]
    fn test_raw_lock_excludes_threads() {
        let lock = RawSpinLock::with_policy(SpinPolicy::new().with_yields_per_retry(1));
        let inside = AtomicUsize::new(0);
        let overlaps = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..2_000 {
                        lock.acquire();
                        if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        inside.fetch_sub(1, Ordering::SeqCst);
                        lock.release();
                    }
                });
            }
        });

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        assert!(!lock.is_locked());
    }
}
