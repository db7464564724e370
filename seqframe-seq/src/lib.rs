//! seqframe-seq: Norpix SEQ container decoding.
//!
//! A SEQ file starts with a fixed little-endian header, padded out to an image
//! offset that depends on the format version, followed by a dense run of
//! fixed-size frame records (payload plus a per-frame footer).
//!
//! # Key Components
//!
//! - [`SeqHeader`] - Table-driven header decode/encode
//! - [`Geometry`] - Frame layout derived from the header and the file size
//! - [`validate`] - Format checks for magic, compression and image format

mod error;
pub mod geometry;
pub mod header;

pub use error::{Error, Result};
pub use geometry::{count_frames, image_offset, validate, Geometry};
pub use header::{
    read_header, FieldKind, HeaderField, HeaderValue, SeqHeader, HEADER_FIELDS, HEADER_SIZE,
};

/// Magic number at offset 0 of every SEQ file.
pub const SEQ_MAGIC: u32 = 0xFEED;

/// `image_format` code for monochrome images.
pub const IMAGE_FORMAT_MONOCHROME: u32 = 100;

/// `compression_format` code for uncompressed frames.
pub const COMPRESSION_NONE: u32 = 0;

/// File extensions recognised as SEQ files.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["seq"];
