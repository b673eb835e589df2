//! Command-line interface definitions

use anyhow::Result;
use clap::Parser;
use spin_sync::{SpinPolicy, DEFAULT_SPIN_LIMIT};

/// Upper bound on operations per worker
const MAX_ITERATIONS: usize = 100_000_000;

/// Upper bound on worker threads per run
const MAX_THREADS: usize = 1024;

/// Compare spin-sync primitives against the standard library under contention
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Worker threads per run (0 = one per CPU)
    #[arg(short, long, default_value = "8")]
    pub threads: usize,

    /// Operations each worker performs per run
    #[arg(short = 'n', long, default_value = "100000")]
    pub iterations: usize,

    /// Suites to run (repeatable; default: all)
    #[arg(short, long = "suite", value_enum)]
    pub suites: Vec<Suite>,

    /// Processor yields between failed lock attempts
    #[arg(long, default_value = "10")]
    pub yields_per_retry: u32,

    /// Polls a waiter performs before parking in the kernel
    ///
    /// Default: 100
    #[arg(long)]
    pub spin_limit: Option<u32>,

    /// Never park waiters; spin until woken
    #[arg(long)]
    pub spin_only: bool,

    /// Show progress information
    #[arg(long)]
    pub progress: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors and results)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Workload to benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Suite {
    /// Every worker loops lock/unlock
    Lock,
    /// Every worker loops signal on a condition variable
    Signal,
    /// Every worker loops signal on a semaphore starting at zero
    Counter,
    /// Binary semaphore guarding a shared total
    Handoff,
}

impl Suite {
    /// Every suite, in run order
    pub const ALL: [Self; 4] = [Self::Lock, Self::Signal, Self::Counter, Self::Handoff];

    /// Display name used in reports
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Lock => "Mutex",
            Self::Signal => "Condition Variable",
            Self::Counter => "Semaphore",
            Self::Handoff => "Semaphore Handoff",
        }
    }
}

impl Args {
    /// Validate command-line arguments
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - Iterations is 0 or above 100000000
    /// - More than 1024 threads are requested
    /// - No CPU cores are available
    /// - Both --quiet and --verbose options are used
    /// - Both --spin-only and --spin-limit are used
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 || self.iterations > MAX_ITERATIONS {
            anyhow::bail!(
                "Iterations must be between 1 and {MAX_ITERATIONS}, got: {}",
                self.iterations
            );
        }

        if self.threads > MAX_THREADS {
            anyhow::bail!(
                "Threads must be at most {MAX_THREADS}, got: {}",
                self.threads
            );
        }

        if self.effective_thread_count() == 0 {
            anyhow::bail!("No CPU cores available");
        }

        if self.quiet && self.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }

        if self.spin_only && self.spin_limit.is_some() {
            anyhow::bail!("Cannot use both --spin-only and --spin-limit options");
        }

        Ok(())
    }

    /// Get the actual thread count to use
    #[must_use]
    pub fn effective_thread_count(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }

    /// Suites selected on the command line, or all of them
    #[must_use]
    pub fn selected_suites(&self) -> Vec<Suite> {
        if self.suites.is_empty() {
            return Suite::ALL.to_vec();
        }
        let mut suites = Vec::with_capacity(self.suites.len());
        for suite in &self.suites {
            if !suites.contains(suite) {
                suites.push(*suite);
            }
        }
        suites
    }

    /// Spin policy for the primitives under test
    #[must_use]
    pub fn spin_policy(&self) -> SpinPolicy {
        let limit = if self.spin_only {
            None
        } else {
            Some(self.spin_limit.unwrap_or(DEFAULT_SPIN_LIMIT))
        };
        SpinPolicy::new()
            .with_yields_per_retry(self.yields_per_retry)
            .with_spin_limit(limit)
    }
}

impl Args {
    /// Create a test Args instance with default values (for testing)
    #[cfg(test)]
    pub fn test_default() -> Self {
        Self {
            threads: 2,
            iterations: 1_000,
            suites: Vec::new(),
            yields_per_retry: 10,
            spin_limit: None,
            spin_only: false,
            progress: false,
            verbose: 0,
            quiet: false,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_defaults() {
        let args = Args::try_parse_from(["spinbench"]).unwrap();
        assert_eq!(args.threads, 8);
        assert_eq!(args.iterations, 100_000);
        assert_eq!(args.selected_suites(), Suite::ALL.to_vec());
        assert_eq!(args.spin_policy(), SpinPolicy::new());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_suites_dedup() {
        let args =
            Args::try_parse_from(["spinbench", "-s", "handoff", "--suite", "lock", "-s", "handoff"])
                .unwrap();
        assert_eq!(args.selected_suites(), vec![Suite::Handoff, Suite::Lock]);
    }

    #[test]
    fn test_spin_policy_from_flags() {
        let args = Args::try_parse_from([
            "spinbench",
            "--yields-per-retry",
            "3",
            "--spin-limit",
            "7",
        ])
        .unwrap();
        assert_eq!(args.spin_policy().yields_per_retry(), 3);
        assert_eq!(args.spin_policy().spin_limit(), Some(7));

        let args = Args::try_parse_from(["spinbench", "--spin-only"]).unwrap();
        assert_eq!(args.spin_policy().spin_limit(), None);
    }

    #[test]
    fn test_effective_thread_count_auto() {
        let mut args = Args::test_default();
        args.threads = 0;
        assert_eq!(args.effective_thread_count(), num_cpus::get());
        assert!(args.validate().is_ok());
    }

    #[rstest]
    #[case::zero_iterations(|a: &mut Args| a.iterations = 0, "Iterations must be between")]
    #[case::too_many_iterations(|a: &mut Args| a.iterations = MAX_ITERATIONS + 1, "Iterations must be between")]
    #[case::too_many_threads(|a: &mut Args| a.threads = MAX_THREADS + 1, "Threads must be at most")]
    #[case::quiet_and_verbose(|a: &mut Args| { a.quiet = true; a.verbose = 1; }, "--quiet and --verbose")]
    #[case::spin_only_and_limit(|a: &mut Args| { a.spin_only = true; a.spin_limit = Some(5); }, "--spin-only and --spin-limit")]
    fn test_validate_rejects(#[case] tweak: fn(&mut Args), #[case] message: &str) {
        let mut args = Args::test_default();
        tweak(&mut args);
        let err = args.validate().unwrap_err();
        assert!(err.to_string().contains(message), "unexpected error: {err}");
    }
}
