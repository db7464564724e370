//! SEQ-specific error types.

use thiserror::Error;

/// Result type for SEQ operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SEQ-specific error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or unrecognised header.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Well-formed file using a feature this reader does not handle.
    #[error("unsupported format: {0}")]
    Unsupported(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
