//! Benchmark suites
//!
//! Every suite runs twice with the same thread and iteration counts: once
//! with the standard library's primitives as the baseline and once with
//! spin-sync. Each run builds its own primitive instances and lends them to
//! scoped worker threads, so nothing outlives the run that created it.
//!
//! # Suites
//!
//! - **Lock**: workers loop lock/unlock on one mutex
//! - **Signal**: workers loop notify on one condition variable with nobody waiting
//! - **Counter**: workers loop signal on one semaphore starting at zero
//! - **Handoff**: workers loop wait / increment / signal on a binary semaphore;
//!   the shared total and an in-section flag are checked afterwards

use crate::cli::{Args, Suite};
use crate::clock::{Measurement, Stopwatch};
use crate::error::{BenchError, Result};
use crate::progress::ProgressTracker;
use crate::report::Comparison;
use spin_sync::{Counter, RawSpinLock, Signal, SpinPolicy};
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread;
use tracing::{debug, info};

/// Parameters shared by every run
#[derive(Debug, Clone, Copy)]
pub struct BenchConfig {
    /// Worker threads per run
    pub threads: usize,
    /// Operations per worker
    pub iterations: usize,
    /// Policy for the spin-sync primitives
    pub policy: SpinPolicy,
}

impl BenchConfig {
    /// Build the run parameters from validated arguments
    #[must_use]
    pub fn from_args(args: &Args) -> Self {
        Self {
            threads: args.effective_thread_count(),
            iterations: args.iterations,
            policy: args.spin_policy(),
        }
    }

    /// Total operations across all workers
    #[must_use]
    pub const fn total_operations(&self) -> usize {
        self.threads * self.iterations
    }
}

/// Semaphore over `std::sync`, the baseline for the counter suites
struct StdSemaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl StdSemaphore {
    const fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }
}

/// Operations the handoff and counter suites need from a semaphore
trait Semaphore: Sync {
    fn wait(&self);
    fn post(&self);
    fn available(&self) -> usize;
}

impl Semaphore for StdSemaphore {
    fn wait(&self) {
        let count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        let mut count = self
            .available
            .wait_while(count, |count| *count == 0)
            .unwrap_or_else(PoisonError::into_inner);
        *count -= 1;
    }

    fn post(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count += 1;
        self.available.notify_one();
    }

    fn available(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Semaphore for Counter {
    fn wait(&self) {
        Self::wait(self);
    }

    fn post(&self) {
        self.signal();
    }

    fn available(&self) -> usize {
        Self::available(self)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

/// Run `work` once on each of `threads` scoped workers and time the whole run
fn run_workers<F>(threads: usize, work: F) -> Result<Measurement>
where
    F: Fn() + Sync,
{
    let watch = Stopwatch::start()?;
    let failures: Vec<String> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads).map(|_| s.spawn(&work)).collect();
        // Join every worker so the scope never re-raises a panic
        handles
            .into_iter()
            .filter_map(|handle| handle.join().err())
            .map(|payload| panic_message(&*payload))
            .collect()
    });
    if let Some(message) = failures.into_iter().next() {
        return Err(BenchError::WorkerPanicked(message));
    }
    watch.stop()
}

fn bench_lock(config: &BenchConfig) -> Result<Comparison> {
    let iterations = config.iterations;

    let mutex = Mutex::new(());
    let baseline = run_workers(config.threads, || {
        for _ in 0..iterations {
            drop(mutex.lock().unwrap_or_else(PoisonError::into_inner));
        }
    })?;

    let lock = RawSpinLock::with_policy(config.policy);
    let candidate = run_workers(config.threads, || {
        for _ in 0..iterations {
            lock.acquire();
            lock.release();
        }
    })?;

    Ok(Comparison {
        suite: Suite::Lock,
        baseline,
        candidate,
    })
}

fn bench_signal(config: &BenchConfig) -> Result<Comparison> {
    let iterations = config.iterations;

    let mutex = Mutex::new(());
    let condvar = Condvar::new();
    let baseline = run_workers(config.threads, || {
        for _ in 0..iterations {
            let guard = mutex.lock().unwrap_or_else(PoisonError::into_inner);
            condvar.notify_one();
            drop(guard);
        }
    })?;

    let signal = Signal::with_policy(config.policy);
    let candidate = run_workers(config.threads, || {
        for _ in 0..iterations {
            signal.signal();
        }
    })?;

    if signal.pending() != 0 {
        return Err(BenchError::Verification(format!(
            "signal with no waiters left {} credits behind",
            signal.pending()
        )));
    }

    Ok(Comparison {
        suite: Suite::Signal,
        baseline,
        candidate,
    })
}

/// Every worker posts `iterations` times; the count must add up
fn post_only<S: Semaphore>(config: &BenchConfig, sem: &S) -> Result<Measurement> {
    let measurement = run_workers(config.threads, || {
        for _ in 0..config.iterations {
            sem.post();
        }
    })?;

    let expected = config.total_operations();
    if sem.available() != expected {
        return Err(BenchError::Verification(format!(
            "semaphore count is {} after {expected} posts",
            sem.available()
        )));
    }
    Ok(measurement)
}

fn bench_counter(config: &BenchConfig) -> Result<Comparison> {
    let baseline = post_only(config, &StdSemaphore::new(0))?;
    let candidate = post_only(config, &Counter::with_policy(0, config.policy))?;

    Ok(Comparison {
        suite: Suite::Counter,
        baseline,
        candidate,
    })
}

/// Binary-semaphore critical section with an unsynchronized total
///
/// The total is updated with a plain load and store, so it only comes out
/// exact if the semaphore really excludes the other workers.
fn handoff<S: Semaphore>(config: &BenchConfig, sem: &S) -> Result<Measurement> {
    let total = AtomicUsize::new(0);
    let in_section = AtomicBool::new(false);
    let overlaps = AtomicUsize::new(0);

    let measurement = run_workers(config.threads, || {
        for _ in 0..config.iterations {
            sem.wait();
            if in_section.swap(true, Ordering::SeqCst) {
                overlaps.fetch_add(1, Ordering::Relaxed);
            }
            let seen = total.load(Ordering::Relaxed);
            total.store(seen + 1, Ordering::Relaxed);
            in_section.store(false, Ordering::SeqCst);
            sem.post();
        }
    })?;

    verify_handoff(
        total.load(Ordering::SeqCst),
        config.total_operations(),
        overlaps.load(Ordering::SeqCst),
    )?;
    Ok(measurement)
}

fn verify_handoff(total: usize, expected: usize, overlaps: usize) -> Result<()> {
    if overlaps > 0 {
        return Err(BenchError::Verification(format!(
            "{overlaps} workers entered the critical section concurrently"
        )));
    }
    if total != expected {
        return Err(BenchError::Verification(format!(
            "shared total is {total}, expected {expected}"
        )));
    }
    Ok(())
}

fn bench_handoff(config: &BenchConfig) -> Result<Comparison> {
    let baseline = handoff(config, &StdSemaphore::new(1))?;
    let candidate = handoff(config, &Counter::with_policy(1, config.policy))?;

    Ok(Comparison {
        suite: Suite::Handoff,
        baseline,
        candidate,
    })
}

/// Run a single suite
///
/// # Errors
///
/// Returns an error if a clock cannot be read, a worker panics, or the run
/// breaks a primitive's contract
pub fn run_suite(suite: Suite, config: &BenchConfig) -> Result<Comparison> {
    debug!(
        suite = suite.label(),
        threads = config.threads,
        iterations = config.iterations,
        "running suite"
    );
    let comparison = match suite {
        Suite::Lock => bench_lock(config),
        Suite::Signal => bench_signal(config),
        Suite::Counter => bench_counter(config),
        Suite::Handoff => bench_handoff(config),
    }?;
    info!(
        suite = suite.label(),
        baseline = ?comparison.baseline.wall,
        candidate = ?comparison.candidate.wall,
        "suite finished"
    );
    Ok(comparison)
}

/// Run `suites` in order, stopping at the first failure
///
/// # Errors
///
/// Returns the first error any suite reports
pub fn run_benchmarks(
    suites: &[Suite],
    config: &BenchConfig,
    progress: &mut ProgressTracker,
) -> Result<Vec<Comparison>> {
    if config.threads == 0 || config.iterations == 0 {
        return Err(BenchError::InvalidConfig(format!(
            "need at least one thread and one iteration, got {} threads and {} iterations",
            config.threads, config.iterations
        )));
    }

    let mut results = Vec::with_capacity(suites.len());
    for &suite in suites {
        progress.start(suite);
        results.push(run_suite(suite, config)?);
        progress.complete();
    }
    progress.finish();
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn small_config() -> BenchConfig {
        BenchConfig {
            threads: 4,
            iterations: 2_000,
            policy: SpinPolicy::new(),
        }
    }

    #[rstest]
    #[case::lock(Suite::Lock)]
    #[case::signal(Suite::Signal)]
    #[case::counter(Suite::Counter)]
    #[case::handoff(Suite::Handoff)]
    fn test_run_suite(#[case] suite: Suite) {
        let comparison = run_suite(suite, &small_config()).unwrap();
        assert_eq!(comparison.suite, suite);
    }

    #[test]
    fn test_handoff_parks_waiters() {
        let config = BenchConfig {
            policy: SpinPolicy::new().with_spin_limit(Some(0)),
            ..small_config()
        };
        handoff(&config, &Counter::with_policy(1, config.policy)).unwrap();
    }

    #[test]
    fn test_std_semaphore_baseline() {
        let sem = StdSemaphore::new(0);
        thread::scope(|s| {
            let waiter = s.spawn(|| sem.wait());
            sem.post();
            waiter.join().unwrap();
        });
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_verify_handoff() {
        assert!(verify_handoff(10, 10, 0).is_ok());
        assert!(matches!(
            verify_handoff(9, 10, 0),
            Err(BenchError::Verification(msg)) if msg.contains("expected 10")
        ));
        assert!(matches!(
            verify_handoff(10, 10, 2),
            Err(BenchError::Verification(msg)) if msg.contains("concurrently")
        ));
    }

    #[test]
    fn test_worker_panic_is_reported() {
        let err = run_workers(2, || panic!("boom")).unwrap_err();
        assert!(matches!(err, BenchError::WorkerPanicked(msg) if msg == "boom"));
    }

    #[test]
    fn test_run_benchmarks_rejects_empty_config() {
        let config = BenchConfig {
            threads: 0,
            ..small_config()
        };
        let mut progress = ProgressTracker::new(1, false);
        let err = run_benchmarks(&[Suite::Lock], &config, &mut progress).unwrap_err();
        assert!(matches!(err, BenchError::InvalidConfig(_)));
    }

    #[test]
    fn test_run_benchmarks_in_order() {
        let mut progress = ProgressTracker::new(2, false);
        let results =
            run_benchmarks(&[Suite::Handoff, Suite::Lock], &small_config(), &mut progress).unwrap();
        let order: Vec<_> = results.iter().map(|c| c.suite).collect();
        assert_eq!(order, vec![Suite::Handoff, Suite::Lock]);
        assert_eq!(progress.suites_done(), 2);
    }
}
