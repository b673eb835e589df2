//! Shared helpers for the primitive property tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Aborts the test process if it is still running when the deadline passes
///
/// A broken wake-up protocol shows up as a hang, not a failed assertion, so
/// every test that blocks on a primitive holds one of these.
pub struct Watchdog {
    finished: Arc<AtomicBool>,
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

pub fn watchdog(name: &'static str, limit: Duration) -> Watchdog {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    thread::spawn(move || {
        thread::sleep(limit);
        if !flag.load(Ordering::SeqCst) {
            eprintln!("{name}: still blocked after {}s, aborting", limit.as_secs());
            std::process::abort();
        }
    });
    Watchdog { finished }
}

/// Yield until `ready` returns true
pub fn wait_until(mut ready: impl FnMut() -> bool) {
    while !ready() {
        thread::yield_now();
    }
}
