//! Fixed-size subrecord payloads
//!
//! Most subrecords are plain structs of a known width. [`FixedBlock`]
//! describes how one such struct is laid out; [`read_fixed`] and
//! [`write_fixed`] add the length validation and subrecord header.

use std::fmt;
use std::io::Write;

use crate::cursor::{ByteCursor, ByteWriter};
use crate::error::{EsmError, Result, Warning, WarningSink};
use crate::tag::Tag;

/// Accepted payload length(s) of a fixed block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedLen {
    Exact(usize),
    /// Several historical sizes, listed ascending
    OneOf(&'static [usize]),
}

impl FixedLen {
    pub fn accepts(self, len: usize) -> bool {
        match self {
            FixedLen::Exact(n) => n == len,
            FixedLen::OneOf(sizes) => sizes.contains(&len),
        }
    }

    /// Size written when nothing else is known: the largest accepted one
    pub fn canonical(self) -> usize {
        match self {
            FixedLen::Exact(n) => n,
            FixedLen::OneOf(sizes) => sizes.iter().copied().max().unwrap_or(0),
        }
    }
}

impl fmt::Display for FixedLen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedLen::Exact(n) => write!(f, "{}", n),
            FixedLen::OneOf(sizes) => {
                for (i, size) in sizes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{}", size)?;
                }
                Ok(())
            }
        }
    }
}

/// A struct stored as one fixed-size subrecord payload
pub trait FixedBlock: Sized {
    const LEN: FixedLen;

    /// Decode from a cursor holding exactly `len` bytes, `len` already validated
    fn decode(cursor: &mut ByteCursor<'_>, len: usize, warnings: &mut WarningSink<'_>)
    -> Result<Self>;

    fn encode<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        warnings: &mut WarningSink<'_>,
    ) -> Result<()>;

    /// Payload size this value encodes to
    fn encoded_len(&self) -> usize {
        Self::LEN.canonical()
    }
}

/// Decode a fixed block from a subrecord payload, rejecting unexpected lengths
pub fn read_fixed<T: FixedBlock>(
    payload: &[u8],
    tag: Tag,
    warnings: &mut Vec<Warning>,
) -> Result<T> {
    if !T::LEN.accepts(payload.len()) {
        return Err(EsmError::LengthMismatch {
            tag,
            expected: T::LEN,
            found: payload.len(),
        });
    }
    let mut cursor = ByteCursor::new(payload);
    let value = T::decode(
        &mut cursor,
        payload.len(),
        &mut WarningSink::new(tag, warnings),
    )?;
    cursor.expect_end(tag)?;
    Ok(value)
}

/// Write header and payload of a fixed block subrecord
pub fn write_fixed<T: FixedBlock, W: Write>(
    writer: &mut ByteWriter<W>,
    tag: Tag,
    value: &T,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    writer.write_subrecord_header(tag, value.encoded_len())?;
    value.encode(writer, &mut WarningSink::new(tag, warnings))
}

impl FixedBlock for u32 {
    const LEN: FixedLen = FixedLen::Exact(4);

    fn decode(cursor: &mut ByteCursor<'_>, _len: usize, _: &mut WarningSink<'_>) -> Result<Self> {
        cursor.read_u32()
    }

    fn encode<W: Write>(&self, writer: &mut ByteWriter<W>, _: &mut WarningSink<'_>) -> Result<()> {
        writer.write_u32(*self)
    }
}

impl FixedBlock for f32 {
    const LEN: FixedLen = FixedLen::Exact(4);

    fn decode(cursor: &mut ByteCursor<'_>, _len: usize, _: &mut WarningSink<'_>) -> Result<Self> {
        cursor.read_f32()
    }

    fn encode<W: Write>(&self, writer: &mut ByteWriter<W>, _: &mut WarningSink<'_>) -> Result<()> {
        writer.write_f32(*self)
    }
}
