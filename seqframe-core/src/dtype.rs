//! On-disk element types.
#![allow(clippy::cast_precision_loss)]

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Native unsigned integer element type of frame payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DType {
    U8,
    U16,
    U32,
    U64,
}

impl DType {
    /// Maps a bit depth to an unsigned element type.
    ///
    /// Only 8, 16, 32 and 64 bits are representable; anything else yields `None`.
    #[must_use]
    pub fn from_bit_depth(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::U8),
            16 => Some(Self::U16),
            32 => Some(Self::U32),
            64 => Some(Self::U64),
            _ => None,
        }
    }

    /// Size of one element in bytes.
    #[must_use]
    pub fn itemsize(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
        }
    }

    /// Decodes little-endian elements from `bytes` and appends them to `out` as `f32`.
    ///
    /// Trailing bytes that do not form a whole element are ignored.
    pub fn extend_f32(self, bytes: &[u8], out: &mut Vec<f32>) {
        match self {
            Self::U8 => out.extend(bytes.iter().map(|&b| f32::from(b))),
            Self::U16 => out.extend(
                bytes
                    .chunks_exact(2)
                    .map(|c| f32::from(u16::from_le_bytes([c[0], c[1]]))),
            ),
            Self::U32 => out.extend(
                bytes
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32),
            ),
            Self::U64 => out.extend(bytes.chunks_exact(8).map(|c| {
                u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32
            })),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A native element type that frame payloads can be decoded into.
pub trait Element: Copy + Send + Sync + 'static {
    /// The matching on-disk type.
    const DTYPE: DType;

    /// Decodes one little-endian element; `bytes` has exactly `DTYPE.itemsize()` bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;
}

impl Element for u8 {
    const DTYPE: DType = DType::U8;

    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl Element for u16 {
    const DTYPE: DType = DType::U16;

    fn from_le_slice(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }
}

impl Element for u32 {
    const DTYPE: DType = DType::U32;

    fn from_le_slice(bytes: &[u8]) -> Self {
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl Element for u64 {
    const DTYPE: DType = DType::U64;

    fn from_le_slice(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        u64::from_le_bytes(buf)
    }
}
