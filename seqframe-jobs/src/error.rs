//! Job error types.

use thiserror::Error;

/// Result type for job execution.
pub type Result<T> = std::result::Result<T, Error>;

/// Job error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading the partition failed.
    #[error(transparent)]
    Io(#[from] seqframe_io::Error),

    /// Core library error (partition planning, configuration).
    #[error(transparent)]
    Core(#[from] seqframe_core::Error),

    /// A result tile was merged into an accumulator of the wrong shape.
    #[error("result of shape {actual:?} cannot be merged into accumulator of shape {expected:?}")]
    ResultShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// The task observed the cancellation flag.
    #[error("task cancelled")]
    Cancelled,

    /// Worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
