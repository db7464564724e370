//! Tile-wise streaming of partition frames.
//!
//! A [`TileStream`] walks the descriptors of a partition's file set in
//! ascending frame order and yields [`Tile`]s: runs of consecutive frames from
//! one file whose decoded payload fits the byte budget. Tiles reference the
//! memory-mapped file instead of copying it; frame headers and footers are
//! skipped by addressing each payload at its record offset.

use crate::reader::MappedFileReader;
use crate::{Error, Result};
use log::debug;
use memmap2::Mmap;
use ndarray::Array3;
use seqframe_core::dtype::Element;
use seqframe_core::{DType, FileDescriptor, FileSet, Slice};
use std::sync::Arc;

/// A run of consecutive frames backed by a memory-mapped file.
#[derive(Clone)]
pub struct Tile {
    slice: Slice,
    dtype: DType,
    map: Arc<Mmap>,
    /// Offset of the first frame payload.
    offset: usize,
    /// Distance between consecutive payloads.
    stride: usize,
    frame_bytes: usize,
    sig_shape: [usize; 2],
}

impl Tile {
    /// Global frames covered, as a slice of the flattened dataset shape.
    #[must_use]
    pub fn slice(&self) -> &Slice {
        &self.slice
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.slice.num_frames()
    }

    /// Per-frame `(height, width)`.
    #[must_use]
    pub fn sig_shape(&self) -> [usize; 2] {
        self.sig_shape
    }

    /// Bytes the tile occupies once decoded in its native type.
    #[must_use]
    pub fn payload_bytes(&self) -> usize {
        self.num_frames() * self.frame_bytes
    }

    /// Raw payload bytes of the `i`-th frame in the tile, or `None` past its end.
    #[must_use]
    pub fn frame_payload(&self, i: usize) -> Option<&[u8]> {
        if i >= self.num_frames() {
            return None;
        }
        let start = self.offset + i * self.stride;
        self.map.get(start..start + self.frame_bytes)
    }

    /// Raw payloads of all frames in order.
    pub fn frame_payloads(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.num_frames()).filter_map(|i| self.frame_payload(i))
    }

    /// Decodes the tile as `(frames, height, width)` in its native element type.
    ///
    /// # Errors
    /// Returns [`Error::DTypeMismatch`] if `T` is not the tile's element type.
    pub fn decode<T: Element>(&self) -> Result<Array3<T>> {
        if T::DTYPE != self.dtype {
            return Err(Error::DTypeMismatch {
                expected: T::DTYPE,
                actual: self.dtype,
            });
        }
        let itemsize = self.dtype.itemsize();
        let mut data = Vec::with_capacity(self.num_frames() * self.frame_bytes / itemsize);
        for payload in self.frame_payloads() {
            data.extend(payload.chunks_exact(itemsize).map(T::from_le_slice));
        }
        self.shaped(data)
    }

    /// Decodes the tile as `(frames, height, width)` converted to `f32`.
    ///
    /// # Errors
    /// Returns an error if the decoded length does not match the tile shape.
    pub fn to_f32(&self) -> Result<Array3<f32>> {
        let mut data =
            Vec::with_capacity(self.num_frames() * self.frame_bytes / self.dtype.itemsize());
        for payload in self.frame_payloads() {
            self.dtype.extend_f32(payload, &mut data);
        }
        self.shaped(data)
    }

    fn shaped<T>(&self, data: Vec<T>) -> Result<Array3<T>> {
        let [height, width] = self.sig_shape;
        Array3::from_shape_vec((self.num_frames(), height, width), data).map_err(|err| {
            Error::Core(seqframe_core::Error::Config(format!(
                "tile of {} frames cannot be shaped to {height}x{width}: {err}",
                self.num_frames()
            )))
        })
    }
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tile")
            .field("slice", &self.slice)
            .field("dtype", &self.dtype)
            .field("offset", &self.offset)
            .field("stride", &self.stride)
            .finish_non_exhaustive()
    }
}

/// A file currently being streamed.
struct OpenFile {
    descriptor: FileDescriptor,
    reader: MappedFileReader,
    next_idx: usize,
    frames_per_tile: usize,
}

/// Lazy, forward-only, non-restartable stream of tiles over a file set.
///
/// After an error the stream is exhausted.
pub struct TileStream {
    files: std::vec::IntoIter<FileDescriptor>,
    current: Option<OpenFile>,
    tile_bytes: usize,
    failed: bool,
}

impl TileStream {
    /// Streams `fileset` in tiles of at most `tile_bytes` decoded bytes.
    ///
    /// A tile always holds at least one frame, even if a single frame exceeds the budget.
    #[must_use]
    pub fn new(fileset: &FileSet, tile_bytes: usize) -> Self {
        Self {
            files: fileset.files().to_vec().into_iter(),
            current: None,
            tile_bytes,
            failed: false,
        }
    }

    fn open_next(&mut self) -> Option<Result<OpenFile>> {
        let descriptor = self.files.next()?;
        debug!(
            "streaming frames {}..{} of {}",
            descriptor.start_idx,
            descriptor.end_idx,
            descriptor.path.display()
        );
        let frames_per_tile = (self.tile_bytes / descriptor.frame_bytes().max(1)).max(1);
        Some(
            MappedFileReader::open(&descriptor.path).map(|reader| OpenFile {
                next_idx: descriptor.start_idx,
                descriptor,
                reader,
                frames_per_tile,
            }),
        )
    }

    fn next_tile(&mut self) -> Option<Result<Tile>> {
        loop {
            if self.current.is_none() {
                match self.open_next()? {
                    Ok(file) => self.current = Some(file),
                    Err(err) => return Some(Err(err)),
                }
            }
            let file = self.current.as_mut()?;
            let desc = &file.descriptor;
            if file.next_idx >= desc.end_idx {
                self.current = None;
                continue;
            }

            let start = file.next_idx;
            let count = file.frames_per_tile.min(desc.end_idx - start);
            let stride = desc.frame_stride();
            let record_start = desc.record_offset(start);
            let available = file.reader.len().saturating_sub(record_start) / stride.max(1);
            if available < count {
                return Some(Err(Error::TruncatedFile {
                    path: desc.path.clone(),
                    frame: start + available,
                }));
            }

            let tile = Tile {
                slice: Slice::frames(start, count, &desc.sig_shape),
                dtype: desc.native_dtype,
                map: file.reader.shared(),
                offset: desc.payload_offset(start),
                stride,
                frame_bytes: desc.frame_bytes(),
                sig_shape: sig_shape_2d(&desc.sig_shape),
            };
            file.next_idx += count;
            return Some(Ok(tile));
        }
    }
}

impl Iterator for TileStream {
    type Item = Result<Tile>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_tile();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
            self.current = None;
        }
        item
    }
}

fn sig_shape_2d(sig_shape: &[usize]) -> [usize; 2] {
    match sig_shape {
        [height, width] => [*height, *width],
        [width] => [1, *width],
        _ => [1, sig_shape.iter().product()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Writes `frames` u8 frames of 2x2 with `header` leading bytes and `footer` bytes per frame.
    fn write_frames(frames: usize, header: usize, footer: usize) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        let mut data = vec![0xEE; header];
        for i in 0..frames {
            let v = u8::try_from(i).unwrap();
            data.extend_from_slice(&[v, v, v, v]);
            data.extend(std::iter::repeat(0xFF).take(footer));
        }
        file.write_all(&data).unwrap();
        file.flush().unwrap();
        file
    }

    fn fileset(file: &NamedTempFile, frames: usize, header: usize, footer: usize) -> FileSet {
        FileSet::new(vec![FileDescriptor::new(
            file.path(),
            0,
            frames,
            DType::U8,
            vec![2, 2],
            0,
            footer,
            header,
        )])
        .unwrap()
    }

    #[test]
    fn test_tiles_respect_budget() {
        let file = write_frames(10, 16, 3);
        let fs = fileset(&file, 10, 16, 3);
        let tiles: Vec<Tile> = TileStream::new(&fs, 12)
            .collect::<Result<_>>()
            .unwrap();
        let counts: Vec<_> = tiles.iter().map(Tile::num_frames).collect();
        assert_eq!(counts, vec![3, 3, 3, 1]);
        for tile in &tiles {
            assert!(tile.payload_bytes() <= 12);
        }
        assert_eq!(tiles[1].slice().nav_range(), 3..6);
    }

    #[test]
    fn test_tile_skips_header_and_footer() {
        let file = write_frames(4, 16, 3);
        let fs = fileset(&file, 4, 16, 3).restrict(1, 4).unwrap();
        let tiles: Vec<Tile> = TileStream::new(&fs, 1024)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(tiles.len(), 1);
        let data = tiles[0].decode::<u8>().unwrap();
        assert_eq!(data.dim(), (3, 2, 2));
        assert!(data.index_axis(ndarray::Axis(0), 0).iter().all(|&v| v == 1));
        assert!(data.index_axis(ndarray::Axis(0), 2).iter().all(|&v| v == 3));
        assert_eq!(tiles[0].frame_payload(1), Some(&[2u8, 2, 2, 2][..]));
        assert!(tiles[0].frame_payload(3).is_none());
    }

    #[test]
    fn test_oversized_frame_still_yields_single_frame_tiles() {
        let file = write_frames(3, 0, 0);
        let fs = fileset(&file, 3, 0, 0);
        let counts: Vec<usize> = TileStream::new(&fs, 1)
            .map(|t| t.unwrap().num_frames())
            .collect();
        assert_eq!(counts, vec![1, 1, 1]);
    }

    #[test]
    fn test_truncated_file_reports_frame() {
        let file = write_frames(5, 8, 2);
        // claim 8 frames where only 5 records exist
        let fs = fileset(&file, 8, 8, 2);
        let mut stream = TileStream::new(&fs, 4 * 2);
        assert_eq!(stream.next().unwrap().unwrap().num_frames(), 2);
        assert_eq!(stream.next().unwrap().unwrap().num_frames(), 2);
        match stream.next() {
            Some(Err(Error::TruncatedFile { frame, .. })) => assert_eq!(frame, 5),
            other => panic!("expected truncation error, got {other:?}"),
        }
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_decode_wrong_dtype() {
        let file = write_frames(1, 0, 0);
        let fs = fileset(&file, 1, 0, 0);
        let tile = TileStream::new(&fs, 64).next().unwrap().unwrap();
        assert!(matches!(
            tile.decode::<u16>(),
            Err(Error::DTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_fileset_yields_nothing() {
        let file = write_frames(2, 0, 0);
        let fs = fileset(&file, 2, 0, 0).restrict(1, 1).unwrap();
        assert_eq!(TileStream::new(&fs, 64).count(), 0);
    }
}
