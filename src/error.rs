//! Error handling and types

use thiserror::Error;

/// Benchmark harness errors
#[derive(Error, Debug)]
pub enum BenchError {
    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker thread panicked during a run
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    /// Reading a clock failed
    #[error("Clock error: {0}")]
    Clock(#[from] std::io::Error),

    /// A run produced a result that breaks the primitive's contract
    #[error("Verification failed: {0}")]
    Verification(String),
}

pub type Result<T> = std::result::Result<T, BenchError>;
