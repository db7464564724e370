//! Frame geometry derived from a decoded header.

use crate::header::SeqHeader;
use crate::{Error, Result, COMPRESSION_NONE, IMAGE_FORMAT_MONOCHROME, SEQ_MAGIC};
use log::warn;
use seqframe_core::DType;

/// Bytes from file start to the first frame record.
///
/// Version 5 and later (StreamPix 6) reserve 8192 bytes, older files 1024.
#[must_use]
pub fn image_offset(version: i32) -> usize {
    if version >= 5 {
        8192
    } else {
        1024
    }
}

/// Number of whole frame records in a file of `file_size` bytes.
///
/// Partial trailing records are not counted.
#[must_use]
pub fn count_frames(file_size: u64, image_offset: usize, true_image_size: u32) -> usize {
    if true_image_size == 0 {
        return 0;
    }
    let payload = file_size.saturating_sub(image_offset as u64);
    usize::try_from(payload / u64::from(true_image_size)).unwrap_or(usize::MAX)
}

/// Checks that the header describes a file this reader can handle.
///
/// # Errors
/// - [`Error::InvalidFormat`] if the magic number is not `0xFEED`.
/// - [`Error::Unsupported`] for compressed or non-monochrome images.
pub fn validate(header: &SeqHeader) -> Result<()> {
    if header.magic != SEQ_MAGIC {
        return Err(Error::InvalidFormat(format!(
            "the format of this .seq file is unrecognized (magic {:#06x})",
            header.magic
        )));
    }
    if header.compression_format != COMPRESSION_NONE {
        return Err(Error::Unsupported(format!(
            "only uncompressed images are supported in .seq files (compression_format {})",
            header.compression_format
        )));
    }
    if header.image_format != IMAGE_FORMAT_MONOCHROME {
        return Err(Error::Unsupported(format!(
            "non-monochrome images are not supported (image_format {})",
            header.image_format
        )));
    }
    Ok(())
}

/// Frame layout of a SEQ file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Geometry {
    /// Bytes to skip at file start.
    pub image_offset: usize,
    /// Native element type of frame payloads.
    pub dtype: DType,
    /// Frame height in pixels.
    pub height: usize,
    /// Frame width in pixels.
    pub width: usize,
    /// Payload bytes per frame.
    pub frame_size_bytes: usize,
    /// Bytes after each frame payload (timestamps and padding).
    pub footer_size: usize,
    /// Bytes per frame record (`frame_size_bytes + footer_size`).
    pub true_image_size: usize,
    /// Whole frame records present in the file.
    pub frame_count: usize,
    /// Timestamps carry a microsecond field (version 5 and later).
    pub timestamp_micro: bool,
}

impl Geometry {
    /// Derives the frame layout from `header` and the actual file size.
    ///
    /// The frame count comes from the file size, not from any header field.
    ///
    /// # Errors
    /// - [`Error::Unsupported`] if `bit_depth` is not 8, 16, 32 or 64.
    /// - [`Error::InvalidFormat`] if the record size is zero or smaller than
    ///   the frame payload.
    pub fn derive(header: &SeqHeader, file_size: u64) -> Result<Self> {
        let image_offset = image_offset(header.version);
        let dtype = DType::from_bit_depth(header.bit_depth).ok_or_else(|| {
            Error::Unsupported(format!("unsupported bit depth: {}", header.bit_depth))
        })?;

        let width = header.width as usize;
        let height = header.height as usize;
        let frame_size_bytes = width
            .checked_mul(height)
            .and_then(|px| px.checked_mul(dtype.itemsize()))
            .ok_or_else(|| {
                Error::InvalidFormat(format!("frame size {width}x{height} overflows"))
            })?;

        let true_image_size = header.true_image_size as usize;
        if true_image_size == 0 {
            return Err(Error::InvalidFormat(
                "true_image_size is 0".to_string(),
            ));
        }
        let footer_size = true_image_size.checked_sub(frame_size_bytes).ok_or_else(|| {
            Error::InvalidFormat(format!(
                "true_image_size {true_image_size} is smaller than the frame payload of {frame_size_bytes} bytes"
            ))
        })?;

        let frame_count = count_frames(file_size, image_offset, header.true_image_size);
        let used = image_offset as u64 + (frame_count as u64) * (true_image_size as u64);
        if file_size > used {
            warn!(
                "{} trailing bytes after the last whole frame are ignored",
                file_size - used
            );
        }

        Ok(Self {
            image_offset,
            dtype,
            height,
            width,
            frame_size_bytes,
            footer_size,
            true_image_size,
            frame_count,
            timestamp_micro: header.version >= 5,
        })
    }

    /// Per-frame signal shape `(height, width)`.
    #[must_use]
    pub fn sig_shape(&self) -> [usize; 2] {
        [self.height, self.width]
    }
}
