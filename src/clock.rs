//! Timing sources for benchmark runs
//!
//! Each run records three numbers: wall-clock time, CPU time consumed by the
//! whole process, and the processor cycle counter where one is available.
//! Spinning primitives trade CPU for latency, so wall time alone hides most
//! of the difference between them and kernel-blocking primitives.

use crate::error::Result;
use std::time::{Duration, Instant};

/// Process CPU time across all threads
///
/// # Errors
///
/// Returns an error if the `clock_gettime` system call fails
#[allow(clippy::cast_sign_loss)] // clock_gettime never reports negative CPU time
pub fn process_cpu_time() -> Result<Duration> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };

    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &raw mut ts) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    Ok(Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32))
}

/// Current value of the processor cycle counter, if the target has one
#[must_use]
pub fn cycle_counter() -> Option<u64> {
    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: rdtsc has no preconditions on x86_64.
        Some(unsafe { core::arch::x86_64::_rdtsc() })
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        None
    }
}

/// Cost of one measured section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Elapsed wall-clock time
    pub wall: Duration,
    /// CPU time consumed by the process
    pub cpu: Duration,
    /// Elapsed processor cycles, `None` without a cycle counter
    pub cycles: Option<u64>,
}

/// Starting point of a measured section
#[derive(Debug)]
pub struct Stopwatch {
    wall: Instant,
    cpu: Duration,
    cycles: Option<u64>,
}

impl Stopwatch {
    /// Record the start of a section
    ///
    /// # Errors
    ///
    /// Returns an error if the CPU clock cannot be read
    pub fn start() -> Result<Self> {
        let cpu = process_cpu_time()?;
        Ok(Self {
            cycles: cycle_counter(),
            cpu,
            wall: Instant::now(),
        })
    }

    /// Record the end of the section
    ///
    /// # Errors
    ///
    /// Returns an error if the CPU clock cannot be read
    pub fn stop(self) -> Result<Measurement> {
        let wall = self.wall.elapsed();
        let cycles = match (self.cycles, cycle_counter()) {
            (Some(start), Some(end)) => Some(end.wrapping_sub(start)),
            _ => None,
        };
        let cpu = process_cpu_time()?.saturating_sub(self.cpu);
        Ok(Measurement { wall, cpu, cycles })
    }
}
