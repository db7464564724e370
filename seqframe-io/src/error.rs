//! I/O error types.

use seqframe_core::DType;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unsupported SEQ file.
    #[error(transparent)]
    Format(#[from] seqframe_seq::Error),

    /// Core library error (range, shape mismatch, configuration).
    #[error(transparent)]
    Core(#[from] seqframe_core::Error),

    /// The file ends inside a frame record.
    #[error("file {} is truncated: frame {frame} extends past the end of the file", path.display())]
    TruncatedFile { path: PathBuf, frame: usize },

    /// Correction array could not be loaded or applied.
    #[error("correction error: {0}")]
    Correction(String),

    /// Tile decoded into the wrong element type.
    #[error("tile holds {actual} elements, requested {expected}")]
    DTypeMismatch { expected: DType, actual: DType },
}
