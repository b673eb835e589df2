//! Progress tracking and reporting

use crate::cli::Suite;
use indicatif::{ProgressBar, ProgressStyle};

pub struct ProgressTracker {
    progress_bar: ProgressBar,
    suites_done: u64,
}

impl ProgressTracker {
    /// Track `total` suites; a hidden bar when `visible` is false
    #[must_use]
    pub fn new(total: usize, visible: bool) -> Self {
        let pb = if visible {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        Self {
            progress_bar: pb,
            suites_done: 0,
        }
    }

    pub fn start(&self, suite: Suite) {
        self.progress_bar.set_message(suite.label());
    }

    pub fn complete(&mut self) {
        self.suites_done += 1;
        self.progress_bar.inc(1);
    }

    #[must_use]
    pub const fn suites_done(&self) -> u64 {
        self.suites_done
    }

    pub fn finish(&self) {
        self.progress_bar.finish_with_message("Benchmarks completed");
    }
}
