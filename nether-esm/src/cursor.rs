//! Sequential byte reader/writer with declared-size accounting
//!
//! [`ByteCursor`] reads little-endian values from a byte slice while
//! tracking how much of a *declared* size has been consumed. Two failures
//! are distinguished:
//!
//! - [`EsmError::Truncated`]: the underlying data is shorter than requested
//! - [`EsmError::Overrun`]: the read would cross the declared size
//!
//! [`ByteWriter`] is the mirror image over any [`Write`] sink.

use std::io::Write;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::dialect::Dialect;
use crate::error::{EsmError, Result};
use crate::tag::{Tag, tags};

/// Saved cursor position for a single step of pushback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

/// Read cursor over a byte slice bounded by a declared size. All reads are little-endian.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    declared: usize,
}

impl<'a> ByteCursor<'a> {
    /// Cursor whose declared size is the whole slice
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            declared: data.len(),
        }
    }

    /// Cursor that may read at most `declared` bytes of `data`.
    ///
    /// `declared` may exceed `data.len()`; reads past the real end then fail
    /// with [`EsmError::Truncated`] instead of [`EsmError::Overrun`].
    pub fn bounded(data: &'a [u8], declared: usize) -> Self {
        Self {
            data,
            pos: 0,
            declared,
        }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn declared_len(&self) -> usize {
        self.declared
    }

    /// Bytes left before the declared size is reached
    pub fn bytes_remaining(&self) -> usize {
        self.declared.saturating_sub(self.pos)
    }

    pub fn is_exhausted(&self) -> bool {
        self.bytes_remaining() == 0
    }

    fn ensure(&self, n: usize) -> Result<()> {
        let remaining = self.bytes_remaining();
        if n > remaining {
            return Err(EsmError::Overrun {
                requested: n,
                remaining,
            });
        }
        let available = self.data.len().saturating_sub(self.pos);
        if n > available {
            return Err(EsmError::Truncated {
                needed: n,
                available,
            });
        }
        Ok(())
    }

    /// Borrow the next `n` bytes
    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }

    pub fn read_tag(&mut self) -> Result<Tag> {
        Ok(Tag(self.read_array::<4>()?))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_exact(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_exact(2)?.read_u16::<LittleEndian>()?)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_exact(2)?.read_i16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_exact(4)?.read_u32::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_exact(4)?.read_i32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.read_exact(4)?.read_f32::<LittleEndian>()?)
    }

    /// Read a length field of `width` bytes (2 or 4)
    pub fn read_length(&mut self, width: usize) -> Result<usize> {
        match width {
            2 => Ok(self.read_u16()? as usize),
            _ => Ok(self.read_u32()? as usize),
        }
    }

    /// Split off the next `len` bytes as an independent cursor
    pub fn sub_cursor(&mut self, len: usize) -> Result<ByteCursor<'a>> {
        Ok(ByteCursor::new(self.read_exact(len)?))
    }

    pub fn mark(&self) -> Mark {
        Mark(self.pos)
    }

    /// Return to an earlier [`Mark`]. Marks from the future are ignored.
    pub fn rewind(&mut self, mark: Mark) {
        if mark.0 <= self.pos {
            self.pos = mark.0;
        }
    }

    /// Fail with [`EsmError::Underrun`] unless the declared size was consumed exactly
    pub fn expect_end(&self, tag: Tag) -> Result<()> {
        match self.bytes_remaining() {
            0 => Ok(()),
            remaining => Err(EsmError::Underrun { tag, remaining }),
        }
    }
}

/// Little-endian writer that knows the dialect's subrecord header layout
pub struct ByteWriter<W: Write> {
    inner: W,
    dialect: Dialect,
    written: usize,
}

impl<W: Write> ByteWriter<W> {
    pub fn new(inner: W, dialect: Dialect) -> Self {
        Self {
            inner,
            dialect,
            written: 0,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn bytes_written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len();
        Ok(())
    }

    pub fn write_zeros(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.write_u8(0)?;
        }
        Ok(())
    }

    pub fn write_tag(&mut self, tag: Tag) -> Result<()> {
        self.write_bytes(tag.as_bytes())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.inner.write_u8(value)?;
        self.written += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.inner.write_u16::<LittleEndian>(value)?;
        self.written += 2;
        Ok(())
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.inner.write_i16::<LittleEndian>(value)?;
        self.written += 2;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_u32::<LittleEndian>(value)?;
        self.written += 4;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.inner.write_i32::<LittleEndian>(value)?;
        self.written += 4;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.inner.write_f32::<LittleEndian>(value)?;
        self.written += 4;
        Ok(())
    }

    /// Write a subrecord header for a payload of `len` bytes.
    ///
    /// In the modern dialect a payload larger than `u16::MAX` is announced by
    /// an `XXXX` subrecord and the real header carries a zero length.
    pub fn write_subrecord_header(&mut self, tag: Tag, len: usize) -> Result<()> {
        match self.dialect {
            Dialect::Legacy => {
                let len = u32::try_from(len).map_err(|_| EsmError::LengthOverflow { tag, len })?;
                self.write_tag(tag)?;
                self.write_u32(len)
            }
            Dialect::Modern => match u16::try_from(len) {
                Ok(short) => {
                    self.write_tag(tag)?;
                    self.write_u16(short)
                }
                Err(_) => {
                    let long =
                        u32::try_from(len).map_err(|_| EsmError::LengthOverflow { tag, len })?;
                    self.write_tag(tags::XXXX)?;
                    self.write_u16(4)?;
                    self.write_u32(long)?;
                    self.write_tag(tag)?;
                    self.write_u16(0)
                }
            },
        }
    }
}

/// Bytes a subrecord with a payload of `len` bytes occupies on disk
pub fn subrecord_size(dialect: Dialect, len: usize) -> usize {
    let extended = dialect == Dialect::Modern && len > u16::MAX as usize;
    let prefix = if extended {
        dialect.subrecord_header_len() + 4
    } else {
        0
    };
    prefix + dialect.subrecord_header_len() + len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x80, 0x3F];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u16().unwrap(), 0x1234);
        assert_eq!(cursor.read_u32().unwrap(), 0x1234_5678);
        assert_eq!(cursor.read_f32().unwrap(), 1.0);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn test_overrun_vs_truncated() {
        let data = [1u8, 2, 3, 4, 5, 6];

        // Declared size smaller than the data: reading past it is an overrun.
        let mut cursor = ByteCursor::bounded(&data, 4);
        assert!(matches!(
            cursor.read_exact(5),
            Err(EsmError::Overrun {
                requested: 5,
                remaining: 4
            })
        ));

        // Declared size larger than the data: the stream ends first.
        let mut cursor = ByteCursor::bounded(&data, 10);
        assert!(matches!(
            cursor.read_exact(8),
            Err(EsmError::Truncated {
                needed: 8,
                available: 6
            })
        ));
    }

    #[test]
    fn test_mark_and_rewind() {
        let data = *b"NAMEFNAM";
        let mut cursor = ByteCursor::new(&data);
        let mark = cursor.mark();
        assert_eq!(cursor.read_tag().unwrap(), tags::NAME);
        cursor.rewind(mark);
        assert_eq!(cursor.read_tag().unwrap(), tags::NAME);
        assert_eq!(cursor.read_tag().unwrap(), tags::FNAM);
    }

    #[test]
    fn test_expect_end_reports_underrun() {
        let data = [0u8; 3];
        let mut cursor = ByteCursor::new(&data);
        cursor.read_u8().unwrap();
        assert!(matches!(
            cursor.expect_end(tags::NPC_),
            Err(EsmError::Underrun { remaining: 2, .. })
        ));
    }

    #[test]
    fn test_modern_header_uses_xxxx_for_large_payloads() {
        let mut writer = ByteWriter::new(Vec::new(), Dialect::Modern);
        writer.write_subrecord_header(tags::DATA, 70_000).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(&bytes[0..4], b"XXXX");
        assert_eq!(&bytes[4..6], &[4, 0]);
        assert_eq!(&bytes[6..10], &70_000u32.to_le_bytes());
        assert_eq!(&bytes[10..14], b"DATA");
        assert_eq!(&bytes[14..16], &[0, 0]);
        assert_eq!(subrecord_size(Dialect::Modern, 70_000), 16 + 70_000);
    }

    #[test]
    fn test_legacy_header_uses_four_byte_length() {
        let mut writer = ByteWriter::new(Vec::new(), Dialect::Legacy);
        writer.write_subrecord_header(tags::FNAM, 5).unwrap();
        assert_eq!(writer.bytes_written(), 8);
        assert_eq!(writer.into_inner(), b"FNAM\x05\0\0\0");
    }
}
