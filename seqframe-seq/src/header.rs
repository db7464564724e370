//! Table-driven SEQ header codec.
//!
//! The header is a run of little-endian fields at fixed offsets. Their order
//! and widths are listed once in [`HEADER_FIELDS`]; both decoding and encoding
//! walk that table, and [`HEADER_SIZE`] is its total width.
//!
//! Text fields are UTF-16 in fixed-width blocks, terminated by the first NUL
//! code unit or by the end of the block.

use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Storage type and width of one header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned 32-bit integer (`DWORD`).
    U32,
    /// Signed 32-bit integer (`LONG`).
    I32,
    /// Unsigned 16-bit integer (`USHORT`).
    U16,
    /// 64-bit float (`DOUBLE`).
    F64,
    /// UTF-16 text in a block of the given number of bytes.
    Text(usize),
}

impl FieldKind {
    /// Width of the field in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::U32 | Self::I32 => 4,
            Self::U16 => 2,
            Self::F64 => 8,
            Self::Text(len) => len,
        }
    }

    /// Decodes a field from exactly `self.width()` bytes.
    fn decode(self, bytes: &[u8]) -> Option<HeaderValue> {
        Some(match self {
            Self::U32 => HeaderValue::U32(u32::from_le_bytes(le_array(bytes))),
            Self::I32 => HeaderValue::I32(i32::from_le_bytes(le_array(bytes))),
            Self::U16 => HeaderValue::U16(u16::from_le_bytes(le_array(bytes))),
            Self::F64 => HeaderValue::F64(f64::from_le_bytes(le_array(bytes))),
            Self::Text(_) => HeaderValue::Text(decode_text(bytes)?),
        })
    }
}

/// Name and layout of one header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderField {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> HeaderField {
    HeaderField { name, kind }
}

/// Header fields in on-disk order.
pub const HEADER_FIELDS: [HeaderField; 26] = [
    field("magic", FieldKind::U32),
    field("name", FieldKind::Text(24)),
    field("version", FieldKind::I32),
    field("header_size", FieldKind::I32),
    field("description", FieldKind::Text(512)),
    field("width", FieldKind::U32),
    field("height", FieldKind::U32),
    field("bit_depth", FieldKind::U32),
    field("bit_depth_real", FieldKind::U32),
    field("image_size_bytes", FieldKind::U32),
    field("image_format", FieldKind::U32),
    field("allocated_frames", FieldKind::U32),
    field("origin", FieldKind::U32),
    field("true_image_size", FieldKind::U32),
    field("suggested_frame_rate", FieldKind::F64),
    field("description_format", FieldKind::I32),
    field("reference_frame", FieldKind::U32),
    field("fixed_size", FieldKind::U32),
    field("flags", FieldKind::U32),
    field("bayer_pattern", FieldKind::I32),
    field("time_offset_us", FieldKind::I32),
    field("extended_header_size", FieldKind::I32),
    field("compression_format", FieldKind::U32),
    field("reference_time_s", FieldKind::I32),
    field("reference_time_ms", FieldKind::U16),
    field("reference_time_us", FieldKind::U16),
];

const fn layout_size(fields: &[HeaderField]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < fields.len() {
        total += fields[i].kind.width();
        i += 1;
    }
    total
}

/// Number of header bytes the decoder reads.
pub const HEADER_SIZE: usize = layout_size(&HEADER_FIELDS);

/// A decoded header field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    U32(u32),
    I32(i32),
    U16(u16),
    F64(f64),
    Text(String),
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U32(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v:?}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Decoded SEQ file header.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeqHeader {
    pub magic: u32,
    pub name: String,
    pub version: i32,
    pub header_size: i32,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u32,
    pub bit_depth_real: u32,
    pub image_size_bytes: u32,
    pub image_format: u32,
    pub allocated_frames: u32,
    pub origin: u32,
    /// Bytes per frame record, footer included.
    pub true_image_size: u32,
    pub suggested_frame_rate: f64,
    pub description_format: i32,
    pub reference_frame: u32,
    pub fixed_size: u32,
    pub flags: u32,
    pub bayer_pattern: i32,
    pub time_offset_us: i32,
    pub extended_header_size: i32,
    pub compression_format: u32,
    pub reference_time_s: i32,
    pub reference_time_ms: u16,
    pub reference_time_us: u16,
}

impl SeqHeader {
    /// Decodes a header from the start of `bytes`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFormat`] if fewer than [`HEADER_SIZE`] bytes are
    /// available or a text field is not valid UTF-16.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::InvalidFormat(format!(
                "header needs {HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let mut values = Vec::with_capacity(HEADER_FIELDS.len());
        let mut pos = 0;
        for field in &HEADER_FIELDS {
            let width = field.kind.width();
            let value = field.kind.decode(&bytes[pos..pos + width]).ok_or_else(|| {
                Error::InvalidFormat(format!("header field {} is not valid UTF-16", field.name))
            })?;
            values.push(value);
            pos += width;
        }

        Self::from_values(values)
    }

    /// Encodes the header into exactly [`HEADER_SIZE`] bytes.
    ///
    /// Text longer than its field is truncated to the field width.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        for (field, value) in HEADER_FIELDS.iter().zip(self.values()) {
            match value {
                HeaderValue::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
                HeaderValue::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
                HeaderValue::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
                HeaderValue::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
                HeaderValue::Text(text) => {
                    let width = field.kind.width();
                    let start = out.len();
                    for unit in text.encode_utf16().take(width / 2) {
                        out.extend_from_slice(&unit.to_le_bytes());
                    }
                    out.resize(start + width, 0);
                }
            }
        }
        out
    }

    /// Field names and values in on-disk order.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, HeaderValue)> {
        HEADER_FIELDS
            .iter()
            .map(|f| f.name)
            .zip(self.values())
            .collect()
    }

    fn values(&self) -> [HeaderValue; 26] {
        [
            HeaderValue::U32(self.magic),
            HeaderValue::Text(self.name.clone()),
            HeaderValue::I32(self.version),
            HeaderValue::I32(self.header_size),
            HeaderValue::Text(self.description.clone()),
            HeaderValue::U32(self.width),
            HeaderValue::U32(self.height),
            HeaderValue::U32(self.bit_depth),
            HeaderValue::U32(self.bit_depth_real),
            HeaderValue::U32(self.image_size_bytes),
            HeaderValue::U32(self.image_format),
            HeaderValue::U32(self.allocated_frames),
            HeaderValue::U32(self.origin),
            HeaderValue::U32(self.true_image_size),
            HeaderValue::F64(self.suggested_frame_rate),
            HeaderValue::I32(self.description_format),
            HeaderValue::U32(self.reference_frame),
            HeaderValue::U32(self.fixed_size),
            HeaderValue::U32(self.flags),
            HeaderValue::I32(self.bayer_pattern),
            HeaderValue::I32(self.time_offset_us),
            HeaderValue::I32(self.extended_header_size),
            HeaderValue::U32(self.compression_format),
            HeaderValue::I32(self.reference_time_s),
            HeaderValue::U16(self.reference_time_ms),
            HeaderValue::U16(self.reference_time_us),
        ]
    }

    fn from_values(values: Vec<HeaderValue>) -> Result<Self> {
        let mut c = ValueCursor {
            fields: HEADER_FIELDS.iter(),
            values: values.into_iter(),
        };
        Ok(Self {
            magic: c.u32()?,
            name: c.text()?,
            version: c.i32()?,
            header_size: c.i32()?,
            description: c.text()?,
            width: c.u32()?,
            height: c.u32()?,
            bit_depth: c.u32()?,
            bit_depth_real: c.u32()?,
            image_size_bytes: c.u32()?,
            image_format: c.u32()?,
            allocated_frames: c.u32()?,
            origin: c.u32()?,
            true_image_size: c.u32()?,
            suggested_frame_rate: c.f64()?,
            description_format: c.i32()?,
            reference_frame: c.u32()?,
            fixed_size: c.u32()?,
            flags: c.u32()?,
            bayer_pattern: c.i32()?,
            time_offset_us: c.i32()?,
            extended_header_size: c.i32()?,
            compression_format: c.u32()?,
            reference_time_s: c.i32()?,
            reference_time_ms: c.u16()?,
            reference_time_us: c.u16()?,
        })
    }
}

/// Reads and decodes the header of the file at `path`.
///
/// # Errors
/// Returns an I/O error if the file cannot be read, or
/// [`Error::InvalidFormat`] if it is shorter than [`HEADER_SIZE`] or the header
/// cannot be decoded.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<SeqHeader> {
    let mut buf = Vec::with_capacity(HEADER_SIZE);
    File::open(path)?
        .take(HEADER_SIZE as u64)
        .read_to_end(&mut buf)?;
    SeqHeader::decode(&buf)
}

/// Walks decoded values alongside the field table.
struct ValueCursor<'a> {
    fields: std::slice::Iter<'a, HeaderField>,
    values: std::vec::IntoIter<HeaderValue>,
}

macro_rules! cursor_take {
    ($name:ident, $variant:ident, $ty:ty) => {
        fn $name(&mut self) -> Result<$ty> {
            match self.next()? {
                (_, HeaderValue::$variant(v)) => Ok(v),
                (name, other) => Err(Error::InvalidFormat(format!(
                    "header field {name} decoded as {other:?}, expected {}",
                    stringify!($ty)
                ))),
            }
        }
    };
}

impl ValueCursor<'_> {
    fn next(&mut self) -> Result<(&'static str, HeaderValue)> {
        match (self.fields.next(), self.values.next()) {
            (Some(field), Some(value)) => Ok((field.name, value)),
            _ => Err(Error::InvalidFormat("header ended early".to_string())),
        }
    }

    cursor_take!(u32, U32, u32);
    cursor_take!(i32, I32, i32);
    cursor_take!(u16, U16, u16);
    cursor_take!(f64, F64, f64);
    cursor_take!(text, Text, String);
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[..N]);
    buf
}

/// Decodes a NUL-terminated UTF-16 block. A leading byte-order mark selects the
/// byte order; little-endian otherwise.
fn decode_text(bytes: &[u8]) -> Option<String> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    let (units, swap) = match units[..end].split_first() {
        Some((0xFEFF, rest)) => (rest, false),
        Some((0xFFFE, rest)) => (rest, true),
        _ => (&units[..end], false),
    };
    char::decode_utf16(
        units
            .iter()
            .map(|&u| if swap { u.swap_bytes() } else { u }),
    )
    .collect::<std::result::Result<String, _>>()
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_header() -> SeqHeader {
        SeqHeader {
            magic: 0xFEED,
            name: "Norpix seq".to_string(),
            version: 5,
            header_size: 1024,
            description: "raster scan, 300 kV".to_string(),
            width: 4,
            height: 3,
            bit_depth: 16,
            bit_depth_real: 12,
            image_size_bytes: 24,
            image_format: 100,
            allocated_frames: 10,
            origin: 1,
            true_image_size: 32,
            suggested_frame_rate: 400.5,
            description_format: 2,
            reference_frame: 0,
            fixed_size: 24,
            flags: 0x11,
            bayer_pattern: -1,
            time_offset_us: -250,
            extended_header_size: 0,
            compression_format: 0,
            reference_time_s: 1_600_000_000,
            reference_time_ms: 999,
            reference_time_us: 7,
        }
    }

    #[test]
    fn test_header_size() {
        assert_eq!(HEADER_SIZE, 632);
    }

    #[test]
    fn test_round_trip() {
        let header = sample_header();
        let bytes = header.encode();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(SeqHeader::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn test_fixed_offsets() {
        let bytes = sample_header().encode();
        assert_eq!(&bytes[0..4], &0xFEEDu32.to_le_bytes());
        // name block occupies bytes 4..28
        assert_eq!(&bytes[4..6], &[b'N', 0]);
        assert_eq!(&bytes[28..32], &5i32.to_le_bytes());
        // width follows the 512-byte description block
        assert_eq!(&bytes[548..552], &4u32.to_le_bytes());
        assert_eq!(&bytes[580..584], &32u32.to_le_bytes());
        assert_eq!(&bytes[584..592], &400.5f64.to_le_bytes());
        assert_eq!(&bytes[628..630], &999u16.to_le_bytes());
    }

    #[test]
    fn test_decode_short_input() {
        let bytes = sample_header().encode();
        let err = SeqHeader::decode(&bytes[..HEADER_SIZE - 1]).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut bytes = sample_header().encode();
        bytes.extend_from_slice(&[0xAB; 100]);
        assert_eq!(SeqHeader::decode(&bytes).unwrap(), sample_header());
    }

    #[test]
    fn test_text_without_terminator_uses_full_width() {
        let mut header = sample_header();
        header.name = "abcdefghijkl".to_string();
        let bytes = header.encode();
        assert_eq!(SeqHeader::decode(&bytes).unwrap().name, "abcdefghijkl");
    }

    #[test]
    fn test_empty_text() {
        let mut header = sample_header();
        header.description = String::new();
        let decoded = SeqHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded.description, "");
    }

    #[test]
    fn test_invalid_utf16_is_format_error() {
        let mut bytes = sample_header().encode();
        // lone high surrogate at the start of the name block
        bytes[4..6].copy_from_slice(&0xD800u16.to_le_bytes());
        bytes[6..8].copy_from_slice(&u16::from(b'x').to_le_bytes());
        let err = SeqHeader::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_big_endian_bom() {
        let mut bytes = sample_header().encode();
        bytes[4..28].fill(0);
        bytes[4..10].copy_from_slice(&[0xFE, 0xFF, 0x00, b'H', 0x00, b'i']);
        assert_eq!(SeqHeader::decode(&bytes).unwrap().name, "Hi");
    }

    #[test]
    fn test_fields_order() {
        let fields = sample_header().fields();
        assert_eq!(fields.len(), HEADER_FIELDS.len());
        assert_eq!(fields[0], ("magic", HeaderValue::U32(0xFEED)));
        assert_eq!(fields[13], ("true_image_size", HeaderValue::U32(32)));
        assert_eq!(fields[14].1.to_string(), "400.5");
    }

    #[test]
    fn test_read_header_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&sample_header().encode()).unwrap();
        file.flush().unwrap();
        assert_eq!(read_header(file.path()).unwrap(), sample_header());
    }

    #[test]
    fn test_read_header_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&sample_header().encode()[..100]).unwrap();
        file.flush().unwrap();
        assert!(matches!(
            read_header(file.path()),
            Err(Error::InvalidFormat(_))
        ));
    }
}
