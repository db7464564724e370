//! Error types for seqframe-core.

use thiserror::Error;

/// Result type alias for seqframe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for seqframe operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Requested frame range is not covered by a file set.
    #[error("frame range [{start}, {stop}) is not covered by file set range [{covered_start}, {covered_stop})")]
    Range {
        start: usize,
        stop: usize,
        covered_start: usize,
        covered_stop: usize,
    },

    /// Caller-supplied navigation shape disagrees with the frames in the file.
    #[error("scan_size doesn't match number of frames: scan_size holds {expected} frames, file holds {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
