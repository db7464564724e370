//! File descriptors and file sets.
//!
//! A [`FileSet`] maps a contiguous range of global frame indices onto byte
//! ranges inside one or more physical files. Each [`FileDescriptor`] covers a
//! half-open frame range `[start_idx, end_idx)` and knows how many bytes to
//! skip before the first frame record and around each frame payload.

use crate::{DType, Error, Result};
use std::ops::Range;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One physical file's role in the logical frame sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileDescriptor {
    /// Path of the file.
    pub path: PathBuf,
    /// First global frame index covered (inclusive).
    pub start_idx: usize,
    /// Last global frame index covered (exclusive).
    pub end_idx: usize,
    /// Global index of the first frame record stored in the file.
    ///
    /// Equal to `start_idx` unless the descriptor was restricted to a sub-range.
    pub file_start_idx: usize,
    /// Element type of the frame payload.
    pub native_dtype: DType,
    /// Per-frame signal shape.
    pub sig_shape: Vec<usize>,
    /// Bytes preceding each frame payload.
    pub frame_header: usize,
    /// Bytes following each frame payload.
    pub frame_footer: usize,
    /// Bytes preceding the first frame record.
    pub file_header: usize,
}

impl FileDescriptor {
    /// Creates a descriptor for a file whose records start at global index `start_idx`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        path: impl AsRef<Path>,
        start_idx: usize,
        end_idx: usize,
        native_dtype: DType,
        sig_shape: Vec<usize>,
        frame_header: usize,
        frame_footer: usize,
        file_header: usize,
    ) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            start_idx,
            end_idx,
            file_start_idx: start_idx,
            native_dtype,
            sig_shape,
            frame_header,
            frame_footer,
            file_header,
        }
    }

    /// Number of frames covered by this descriptor.
    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.end_idx - self.start_idx
    }

    /// Global frame range covered by this descriptor.
    #[must_use]
    pub fn frame_range(&self) -> Range<usize> {
        self.start_idx..self.end_idx
    }

    /// Payload bytes per frame.
    #[must_use]
    pub fn frame_bytes(&self) -> usize {
        self.sig_shape.iter().product::<usize>() * self.native_dtype.itemsize()
    }

    /// Bytes per frame record, including per-frame header and footer.
    #[must_use]
    pub fn frame_stride(&self) -> usize {
        self.frame_header + self.frame_bytes() + self.frame_footer
    }

    /// Byte offset of the record of global frame `idx` within the file.
    #[must_use]
    pub fn record_offset(&self, idx: usize) -> usize {
        self.file_header + (idx - self.file_start_idx) * self.frame_stride()
    }

    /// Byte offset of the payload of global frame `idx` within the file.
    #[must_use]
    pub fn payload_offset(&self, idx: usize) -> usize {
        self.record_offset(idx) + self.frame_header
    }

    fn clipped(&self, start: usize, stop: usize) -> Self {
        Self {
            start_idx: start.max(self.start_idx),
            end_idx: stop.min(self.end_idx),
            ..self.clone()
        }
    }

    fn same_layout(&self, other: &Self) -> bool {
        self.path == other.path
            && self.file_start_idx == other.file_start_idx
            && self.native_dtype == other.native_dtype
            && self.sig_shape == other.sig_shape
            && self.frame_header == other.frame_header
            && self.frame_footer == other.frame_footer
            && self.file_header == other.file_header
    }
}

/// Ordered descriptors tiling a contiguous global frame range without gaps or overlaps.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileSet {
    files: Vec<FileDescriptor>,
    start: usize,
    stop: usize,
}

impl FileSet {
    /// Creates a file set from descriptors in ascending frame order.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the descriptors leave a gap, overlap, or
    /// describe an inverted range.
    pub fn new(files: Vec<FileDescriptor>) -> Result<Self> {
        let start = files.first().map_or(0, |f| f.start_idx);
        let mut expected = start;
        for file in &files {
            if file.start_idx > file.end_idx || file.file_start_idx > file.start_idx {
                return Err(Error::Config(format!(
                    "descriptor for {} has invalid range [{}, {})",
                    file.path.display(),
                    file.start_idx,
                    file.end_idx
                )));
            }
            if file.start_idx != expected {
                return Err(Error::Config(format!(
                    "descriptor for {} starts at frame {} but frame {} was expected",
                    file.path.display(),
                    file.start_idx,
                    expected
                )));
            }
            expected = file.end_idx;
        }
        Ok(Self {
            files,
            start,
            stop: expected,
        })
    }

    /// An empty file set positioned at frame `at`.
    #[must_use]
    pub fn empty_at(at: usize) -> Self {
        Self {
            files: Vec::new(),
            start: at,
            stop: at,
        }
    }

    #[must_use]
    pub fn files(&self) -> &[FileDescriptor] {
        &self.files
    }

    /// Global frame range covered.
    #[must_use]
    pub fn frame_range(&self) -> Range<usize> {
        self.start..self.stop
    }

    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.stop - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    /// Returns descriptors covering exactly `[start, stop)`, split at the boundaries.
    ///
    /// # Errors
    /// Returns [`Error::Range`] if the range is inverted or not fully covered.
    pub fn restrict(&self, start: usize, stop: usize) -> Result<Self> {
        if start > stop || start < self.start || stop > self.stop {
            return Err(Error::Range {
                start,
                stop,
                covered_start: self.start,
                covered_stop: self.stop,
            });
        }
        let files = self
            .files
            .iter()
            .filter(|f| f.start_idx.max(start) < f.end_idx.min(stop))
            .map(|f| f.clipped(start, stop))
            .collect();
        Ok(Self { files, start, stop })
    }

    /// Appends a file set that starts where this one stops.
    ///
    /// Adjacent pieces of the same physical file are coalesced, so
    /// `restrict(a, b)` followed by `restrict(b, c)` concatenates to `restrict(a, c)`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `other` does not start at this set's end.
    pub fn concat(&self, other: &FileSet) -> Result<Self> {
        if other.start != self.stop {
            return Err(Error::Config(format!(
                "cannot append frames [{}, {}) after frame {}",
                other.start, other.stop, self.stop
            )));
        }
        let mut files = self.files.clone();
        for next in &other.files {
            match files.last_mut() {
                Some(last) if last.end_idx == next.start_idx && last.same_layout(next) => {
                    last.end_idx = next.end_idx;
                }
                _ => files.push(next.clone()),
            }
        }
        Ok(Self {
            files,
            start: self.start,
            stop: other.stop,
        })
    }
}
