//! Result formatting
//!
//! A [`Comparison`] pairs the standard-library baseline with the spin-sync
//! run of one suite. It renders as the same block of lines for every suite:
//!
//! ```text
//! std Mutex: 0.041233 s wall, 0.301234 s cpu, 123,456,789 cycles
//! spin-sync Mutex: 0.020011 s wall, 0.150002 s cpu, 61,234,567 cycles
//! spin-sync Mutex is 48.53% of std Mutex time.
//! ```

use crate::clock::Measurement;
use crate::cli::Suite;
use std::fmt;

/// Group the digits of `n` in threes: `1234567` becomes `1,234,567`
#[must_use]
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Baseline and spin-sync measurements for one suite
#[derive(Debug, Clone, Copy)]
pub struct Comparison {
    pub suite: Suite,
    pub baseline: Measurement,
    pub candidate: Measurement,
}

impl Comparison {
    /// Candidate wall time as a percentage of the baseline's
    ///
    /// Returns `None` when the baseline finished too fast to measure.
    #[must_use]
    pub fn wall_percentage(&self) -> Option<f64> {
        let base = self.baseline.wall.as_secs_f64();
        (base > 0.0).then(|| self.candidate.wall.as_secs_f64() / base * 100.0)
    }
}

fn write_measurement(f: &mut fmt::Formatter<'_>, name: &str, m: &Measurement) -> fmt::Result {
    write!(
        f,
        "{name}: {:.6} s wall, {:.6} s cpu",
        m.wall.as_secs_f64(),
        m.cpu.as_secs_f64()
    )?;
    match m.cycles {
        Some(cycles) => writeln!(f, ", {} cycles", format_thousands(cycles)),
        None => writeln!(f),
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.suite.label();
        write_measurement(f, &format!("std {label}"), &self.baseline)?;
        write_measurement(f, &format!("spin-sync {label}"), &self.candidate)?;
        match self.wall_percentage() {
            Some(pct) => writeln!(f, "spin-sync {label} is {pct:.2}% of std {label} time."),
            None => writeln!(f, "std {label} finished too quickly to compare."),
        }
    }
}
