//! Minimal MRC2014 reader and writer for correction arrays.
//!
//! Supports little-endian files in modes 0 (int8), 1 (int16), 2 (float32)
//! and 6 (uint16). Data is returned as `f32` with shape `(nz, ny, nx)` and
//! all length-1 axes removed.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use crate::reader::MappedFileReader;
use crate::{Error, Result};
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Size of the fixed MRC header.
pub const MRC_HEADER_SIZE: usize = 1024;

const MODE_INT8: i32 = 0;
const MODE_INT16: i32 = 1;
const MODE_FLOAT32: i32 = 2;
const MODE_UINT16: i32 = 6;

/// Reads the MRC file at `path` as a squeezed `f32` array.
///
/// # Errors
/// Returns an error if the file cannot be read or is not a supported MRC file.
pub fn read_mrc<P: AsRef<Path>>(path: P) -> Result<ArrayD<f32>> {
    let reader = MappedFileReader::open(path)?;
    decode_mrc(reader.as_bytes())
}

/// Decodes MRC bytes as a squeezed `f32` array.
///
/// # Errors
/// Returns [`Error::Correction`] for truncated, big-endian or unsupported-mode data.
pub fn decode_mrc(bytes: &[u8]) -> Result<ArrayD<f32>> {
    if bytes.len() < MRC_HEADER_SIZE {
        return Err(Error::Correction(format!(
            "MRC header needs {MRC_HEADER_SIZE} bytes, got {}",
            bytes.len()
        )));
    }
    // MACHST: 0x44 0x4? for little-endian, 0x11 0x11 for big-endian
    if bytes[212] == 0x11 {
        return Err(Error::Correction(
            "big-endian MRC files are not supported".to_string(),
        ));
    }

    let dims = [read_i32(bytes, 8), read_i32(bytes, 4), read_i32(bytes, 0)];
    if dims.iter().any(|&d| d <= 0) {
        return Err(Error::Correction(format!(
            "invalid MRC dimensions (nz, ny, nx) = {dims:?}"
        )));
    }
    let dims = dims.map(|d| d as usize);
    let mode = read_i32(bytes, 12);
    let extended = usize::try_from(read_i32(bytes, 92)).unwrap_or(0);

    let itemsize = match mode {
        MODE_INT8 => 1,
        MODE_INT16 | MODE_UINT16 => 2,
        MODE_FLOAT32 => 4,
        other => {
            return Err(Error::Correction(format!("unsupported MRC mode {other}")));
        }
    };
    let end = dims
        .iter()
        .try_fold(itemsize, |acc: usize, &d| acc.checked_mul(d))
        .and_then(|len| len.checked_add(MRC_HEADER_SIZE)?.checked_add(extended))
        .ok_or_else(|| {
            Error::Correction(format!(
                "MRC dimensions (nz, ny, nx) = {dims:?} exceed addressable size"
            ))
        })?;
    let start = MRC_HEADER_SIZE + extended;
    if bytes.len() < end {
        return Err(Error::Correction(format!(
            "MRC data needs {end} bytes, file holds {}",
            bytes.len()
        )));
    }

    let raw = &bytes[start..end];
    let data: Vec<f32> = match mode {
        MODE_INT8 => raw.iter().map(|&b| f32::from(b as i8)).collect(),
        MODE_INT16 => raw
            .chunks_exact(2)
            .map(|c| f32::from(i16::from_le_bytes([c[0], c[1]])))
            .collect(),
        MODE_UINT16 => raw
            .chunks_exact(2)
            .map(|c| f32::from(u16::from_le_bytes([c[0], c[1]])))
            .collect(),
        _ => raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    };

    let squeezed: Vec<usize> = dims.iter().copied().filter(|&d| d != 1).collect();
    ArrayD::from_shape_vec(IxDyn(&squeezed), data)
        .map_err(|err| Error::Correction(format!("MRC data cannot be shaped: {err}")))
}

/// Writes a 1 to 3 dimensional `f32` array as a mode-2 MRC file.
///
/// # Errors
/// Returns an error if the array rank is unsupported or the file cannot be written.
pub fn write_mrc<P: AsRef<Path>>(path: P, data: &ArrayViewD<f32>) -> Result<()> {
    let (nz, ny, nx) = match *data.shape() {
        [nx] => (1, 1, nx),
        [ny, nx] => (1, ny, nx),
        [nz, ny, nx] => (nz, ny, nx),
        _ => {
            return Err(Error::Correction(format!(
                "cannot write a {}-dimensional array as MRC",
                data.ndim()
            )))
        }
    };
    let mut header = vec![0u8; MRC_HEADER_SIZE];
    for (offset, value) in [
        (0, nx as i32),
        (4, ny as i32),
        (8, nz as i32),
        (12, MODE_FLOAT32),
        (28, nx as i32),
        (32, ny as i32),
        (36, nz as i32),
        (64, 1),
        (68, 2),
        (72, 3),
        (104, 20140),
    ] {
        header[offset..offset + 4].copy_from_slice(&i32::to_le_bytes(value));
    }
    header[208..212].copy_from_slice(b"MAP ");
    header[212..214].copy_from_slice(&[0x44, 0x44]);

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&header)?;
    for value in data.iter() {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
