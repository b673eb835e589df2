//! spinbench: compare spin-sync primitives against the standard library
//!
//! This library holds the benchmark harness behind the `spinbench` binary:
//! argument parsing, the suites themselves, timing and report formatting.
//! The primitives under test live in the `spin-sync` workspace crate.

pub mod bench;
pub mod cli;
pub mod clock;
pub mod error;
pub mod progress;
pub mod report;

// Re-export commonly used types
pub use bench::{run_benchmarks, run_suite, BenchConfig};
pub use cli::{Args, Suite};
pub use error::{BenchError, Result};
pub use report::Comparison;
