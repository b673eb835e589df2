//! Criterion benchmarks for the uncontended paths of spin-sync

use criterion::{criterion_group, criterion_main, Criterion};
use spin_sync::{Counter, RawSpinLock, Signal, SpinLock};
use std::hint::black_box;

fn lock_benches(c: &mut Criterion) {
    let raw = RawSpinLock::new();
    c.bench_function("raw_spinlock_acquire_release", |b| {
        b.iter(|| {
            raw.acquire();
            raw.release();
        });
    });

    let lock = SpinLock::new(0u64);
    c.bench_function("spinlock_guard_increment", |b| {
        b.iter(|| *lock.lock() += black_box(1));
    });

    let mutex = std::sync::Mutex::new(0u64);
    c.bench_function("std_mutex_guard_increment", |b| {
        b.iter(|| {
            if let Ok(mut guard) = mutex.lock() {
                *guard += black_box(1);
            }
        });
    });
}

fn signal_benches(c: &mut Criterion) {
    let signal = Signal::new();
    c.bench_function("signal_without_waiters", |b| b.iter(|| signal.signal()));
    c.bench_function("broadcast_without_waiters", |b| b.iter(|| signal.broadcast()));
}

fn counter_benches(c: &mut Criterion) {
    let counter = Counter::new(1);
    c.bench_function("counter_wait_signal", |b| {
        b.iter(|| {
            counter.wait();
            counter.signal();
        });
    });
    c.bench_function("counter_permit", |b| b.iter(|| drop(black_box(counter.acquire()))));
}

criterion_group!(benches, lock_benches, signal_benches, counter_benches);
criterion_main!(benches);
