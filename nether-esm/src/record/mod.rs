//! Records and the subrecord loop
//!
//! ```text
//! Legacy header (16 bytes):  tag  size:u32  header:u32  flags:u32
//! Modern header (24 bytes):  tag  size:u32  flags:u32   form_id:u32  revision:u32  version:u16  unknown:u16
//! ```
//!
//! `size` counts the body only. The body is a sequence of subrecords that
//! must consume exactly `size` bytes.

mod actor;
mod creature;
mod generic;
mod misc;
mod npc;

pub use actor::{ActorData, AiData, InventoryItem};
pub use creature::{CreatureData, CreatureFlags, CreatureRecord};
pub use generic::{GenericBody, GenericRecord};
pub use misc::{MiscData, MiscRecord, ObjectBounds};
pub use npc::{NpcFlags, NpcRecord, NpcStats};

use std::io::Write;

use serde::Serialize;

use crate::cursor::{ByteCursor, ByteWriter, Mark};
use crate::destination::Destination;
use crate::dialect::Dialect;
use crate::error::{EsmError, Result, Warning, WarningSink};
use crate::fixed::FixedLen;
use crate::localized::Session;
use crate::package::BehaviorPackageGroup;
use crate::string::write_string;
use crate::tag::{Tag, tags};

bitflags::bitflags! {
    /// Record flag word. Bit meanings differ slightly between dialects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RecordFlags: u32 {
        /// File header record only: the file is a master
        const MASTER = 0x0000_0001;
        const DELETED = 0x0000_0020;
        /// File header record only: names are string table indices
        const LOCALIZED = 0x0000_0080;
        const PERSISTENT = 0x0000_0400;
        const IGNORED = 0x0000_1000;
        const BLOCKED = 0x0000_2000;
        /// Body is zlib-compressed (modern dialect)
        const COMPRESSED = 0x0004_0000;
    }
}

/// Trailing header words of the modern dialect, kept for round-trip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub revision: u32,
    pub version: u16,
    pub unknown: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordHeader {
    pub tag: Tag,
    /// Body size in bytes, recomputed on encode
    pub size: u32,
    pub flags1: u32,
    pub flags2: u32,
    /// Present exactly when the header was read in the modern dialect
    pub version_info: Option<VersionInfo>,
}

impl RecordHeader {
    pub fn new(tag: Tag, dialect: Dialect) -> Self {
        Self {
            tag,
            size: 0,
            flags1: 0,
            flags2: 0,
            version_info: match dialect {
                Dialect::Legacy => None,
                Dialect::Modern => Some(VersionInfo::default()),
            },
        }
    }

    pub fn read(cursor: &mut ByteCursor<'_>, dialect: Dialect) -> Result<Self> {
        let tag = cursor.read_tag()?;
        let size = cursor.read_u32()?;
        let flags1 = cursor.read_u32()?;
        let flags2 = cursor.read_u32()?;
        let version_info = match dialect {
            Dialect::Legacy => None,
            Dialect::Modern => Some(VersionInfo {
                revision: cursor.read_u32()?,
                version: cursor.read_u16()?,
                unknown: cursor.read_u16()?,
            }),
        };
        Ok(Self {
            tag,
            size,
            flags1,
            flags2,
            version_info,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut ByteWriter<W>) -> Result<()> {
        writer.write_tag(self.tag)?;
        writer.write_u32(self.size)?;
        writer.write_u32(self.flags1)?;
        writer.write_u32(self.flags2)?;
        if writer.dialect() == Dialect::Modern {
            let info = self.version_info.unwrap_or_default();
            writer.write_u32(info.revision)?;
            writer.write_u16(info.version)?;
            writer.write_u16(info.unknown)?;
        }
        Ok(())
    }

    fn dialect(&self) -> Dialect {
        if self.version_info.is_some() {
            Dialect::Modern
        } else {
            Dialect::Legacy
        }
    }

    /// The flag word: `flags2` in the legacy dialect, `flags1` in the modern one
    pub fn flags(&self) -> RecordFlags {
        RecordFlags::from_bits_retain(match self.dialect() {
            Dialect::Legacy => self.flags2,
            Dialect::Modern => self.flags1,
        })
    }

    pub fn set_flags(&mut self, flags: RecordFlags) {
        match self.dialect() {
            Dialect::Legacy => self.flags2 = flags.bits(),
            Dialect::Modern => self.flags1 = flags.bits(),
        }
    }

    /// Form id (modern dialect only)
    pub fn form_id(&self) -> Option<u32> {
        self.version_info.map(|_| self.flags2)
    }
}

/// Tag and payload length of one subrecord
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubrecordHeader {
    pub tag: Tag,
    pub len: usize,
}

impl SubrecordHeader {
    /// Fail unless the payload length is `expected`
    pub fn expect_len(&self, expected: usize) -> Result<()> {
        if self.len != expected {
            return Err(EsmError::LengthMismatch {
                tag: self.tag,
                expected: FixedLen::Exact(expected),
                found: self.len,
            });
        }
        Ok(())
    }
}

/// Walks the subrecords of one record body.
///
/// Headers and payloads are read separately so that presence rules can be
/// checked before any payload is touched.
pub struct SubrecordReader<'a> {
    cursor: ByteCursor<'a>,
    dialect: Dialect,
    record: Tag,
    last: Option<Mark>,
}

impl<'a> SubrecordReader<'a> {
    /// `body` holds the bytes following the record header, `declared` the
    /// header's size field.
    pub fn new(body: &'a [u8], declared: usize, record: Tag, dialect: Dialect) -> Self {
        Self {
            cursor: ByteCursor::bounded(body, declared),
            dialect,
            record,
            last: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn record(&self) -> Tag {
        self.record
    }

    /// Next subrecord header, or `None` once the declared size is consumed
    pub fn next_header(&mut self) -> Result<Option<SubrecordHeader>> {
        if self.cursor.is_exhausted() {
            return Ok(None);
        }
        let mark = self.cursor.mark();
        let width = self.dialect.length_width();
        let mut tag = self.cursor.read_tag()?;
        let mut len = self.cursor.read_length(width)?;

        if self.dialect == Dialect::Modern && tag == tags::XXXX {
            SubrecordHeader { tag, len }.expect_len(4)?;
            let real_len = self.cursor.read_u32()? as usize;
            tag = self.cursor.read_tag()?;
            if tag == tags::XXXX {
                return Err(EsmError::DuplicateTag {
                    record: self.record,
                    tag,
                });
            }
            // The subrecord's own length field is meaningless after XXXX
            self.cursor.read_length(width)?;
            len = real_len;
        }

        self.last = Some(mark);
        tracing::trace!(record = %self.record, %tag, len, "subrecord");
        Ok(Some(SubrecordHeader { tag, len }))
    }

    /// Push back the header returned by the last [`next_header`](Self::next_header)
    pub fn unread(&mut self) {
        if let Some(mark) = self.last.take() {
            self.cursor.rewind(mark);
        }
    }

    /// Payload of the subrecord whose header was just read
    pub fn payload(&mut self, header: &SubrecordHeader) -> Result<&'a [u8]> {
        self.last = None;
        self.cursor.read_exact(header.len)
    }

    /// Keep the subrecord as raw bytes
    pub fn read_raw(&mut self, header: &SubrecordHeader) -> Result<RawSubrecord> {
        Ok(RawSubrecord {
            tag: header.tag,
            data: self.payload(header)?.to_vec(),
        })
    }

    /// Bytes of the body consumed so far
    pub fn consumed(&self) -> usize {
        self.cursor.position()
    }

    /// Verify the declared size was consumed exactly
    pub fn finish(self) -> Result<usize> {
        self.cursor.expect_end(self.record)?;
        Ok(self.cursor.position())
    }
}

/// Subrecord kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawSubrecord {
    pub tag: Tag,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl RawSubrecord {
    pub fn new(tag: Tag, data: Vec<u8>) -> Self {
        Self { tag, data }
    }

    pub fn write<W: Write>(&self, writer: &mut ByteWriter<W>) -> Result<()> {
        writer.write_subrecord_header(self.tag, self.data.len())?;
        writer.write_bytes(&self.data)
    }
}

/// A typed record layout
pub trait RecordCodec: Sized {
    /// Record type tag
    const TAG: Tag;

    /// Decode the body. The caller checks the size invariant afterwards.
    fn decode(
        header: RecordHeader,
        body: &mut SubrecordReader<'_>,
        session: &Session<'_>,
        warnings: &mut Vec<Warning>,
    ) -> Result<Self>;

    /// Write every subrecord of the body in canonical order
    fn encode_body<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        session: &Session<'_>,
        warnings: &mut Vec<Warning>,
    ) -> Result<()>;

    fn header(&self) -> &RecordHeader;
}

/// Decode a typed record from its header and body bytes
pub fn decode_record<T: RecordCodec>(
    header: RecordHeader,
    body: &[u8],
    session: &Session<'_>,
    warnings: &mut Vec<Warning>,
) -> Result<T> {
    let mut reader = SubrecordReader::new(body, header.size as usize, header.tag, session.dialect);
    let record = T::decode(header, &mut reader, session, warnings)?;
    reader.finish()?;
    Ok(record)
}

/// Write `header` with its size replaced by the length of `body`, then `body`
pub(crate) fn write_with_body<W: Write>(
    writer: &mut ByteWriter<W>,
    header: &RecordHeader,
    body: &[u8],
) -> Result<()> {
    let size = u32::try_from(body.len()).map_err(|_| EsmError::LengthOverflow {
        tag: header.tag,
        len: body.len(),
    })?;
    let header = RecordHeader {
        size,
        ..header.clone()
    };
    header.write(writer)?;
    writer.write_bytes(body)
}

/// Write an inline string subrecord, collecting warnings into `warnings`
pub(crate) fn put_string<W: Write>(
    writer: &mut ByteWriter<W>,
    tag: Tag,
    value: &str,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    write_string(writer, tag, value, &mut WarningSink::new(tag, warnings))
}

/// Encode a typed record, recomputing its size
pub fn encode_record<T: RecordCodec, W: Write>(
    record: &T,
    writer: &mut ByteWriter<W>,
    session: &Session<'_>,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    let mut body = ByteWriter::new(Vec::new(), writer.dialect());
    record.encode_body(&mut body, session, warnings)?;
    write_with_body(writer, record.header(), &body.into_inner())
}

/// Any record this crate can decode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Npc(NpcRecord),
    Creature(CreatureRecord),
    Misc(MiscRecord),
    Generic(GenericRecord),
}

impl Record {
    /// Whether `tag` has a typed layout in `dialect`
    pub fn is_typed(tag: Tag, dialect: Dialect) -> bool {
        matches!(
            (tag, dialect),
            (tags::NPC_, Dialect::Legacy) | (tags::CREA, Dialect::Legacy) | (tags::MISC, Dialect::Modern)
        )
    }

    /// Decode a record body, choosing the layout by tag and dialect.
    ///
    /// Unknown record types become [`GenericRecord`]s. A compressed body is
    /// only accepted for those, and then kept opaque.
    pub fn decode(
        header: RecordHeader,
        body: &[u8],
        session: &Session<'_>,
        warnings: &mut Vec<Warning>,
    ) -> Result<Record> {
        let typed = Self::is_typed(header.tag, session.dialect);
        if session.dialect == Dialect::Modern && header.flags().contains(RecordFlags::COMPRESSED) {
            if typed {
                return Err(EsmError::UnsupportedFeature {
                    tag: header.tag,
                    feature: "compressed record body",
                });
            }
            return Ok(Record::Generic(GenericRecord::compressed(header, body)?));
        }

        tracing::debug!(tag = %header.tag, size = header.size, "decoding record");
        let record = match (header.tag, session.dialect) {
            (tags::NPC_, Dialect::Legacy) => {
                Record::Npc(decode_record(header, body, session, warnings)?)
            }
            (tags::CREA, Dialect::Legacy) => {
                Record::Creature(decode_record(header, body, session, warnings)?)
            }
            (tags::MISC, Dialect::Modern) => {
                Record::Misc(decode_record(header, body, session, warnings)?)
            }
            _ => Record::Generic(decode_record(header, body, session, warnings)?),
        };
        Ok(record)
    }

    pub fn encode<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        session: &Session<'_>,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        match self {
            Record::Npc(r) => encode_record(r, writer, session, warnings),
            Record::Creature(r) => encode_record(r, writer, session, warnings),
            Record::Misc(r) => encode_record(r, writer, session, warnings),
            Record::Generic(r) => r.encode(writer),
        }
    }

    pub fn header(&self) -> &RecordHeader {
        match self {
            Record::Npc(r) => r.header(),
            Record::Creature(r) => r.header(),
            Record::Misc(r) => r.header(),
            Record::Generic(r) => r.header(),
        }
    }

    pub fn tag(&self) -> Tag {
        self.header().tag
    }

    /// Editor id of the record, if it has one
    pub fn id(&self) -> Option<&str> {
        match self {
            Record::Npc(r) => Some(&r.id),
            Record::Creature(r) => Some(&r.id),
            Record::Misc(r) => Some(&r.editor_id),
            Record::Generic(_) => None,
        }
    }

    /// Behavior packages of actor records
    pub fn packages(&self) -> Option<&BehaviorPackageGroup> {
        match self {
            Record::Npc(r) => Some(&r.actor.packages),
            Record::Creature(r) => Some(&r.actor.packages),
            _ => None,
        }
    }

    /// Travel destinations of actor records
    pub fn destinations(&self) -> Option<&[Destination]> {
        match self {
            Record::Npc(r) => Some(&r.actor.destinations),
            Record::Creature(r) => Some(&r.actor.destinations),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// Assemble a subrecord in `dialect`
    pub fn sub(dialect: Dialect, tag: Tag, payload: &[u8]) -> Vec<u8> {
        let mut writer = ByteWriter::new(Vec::new(), dialect);
        writer.write_subrecord_header(tag, payload.len()).unwrap();
        writer.write_bytes(payload).unwrap();
        writer.into_inner()
    }

    /// NUL-terminated string payload
    pub fn z(text: &str) -> Vec<u8> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        bytes
    }

    /// Header with `size` matching `body`
    pub fn header_for(tag: Tag, dialect: Dialect, body: &[u8]) -> RecordHeader {
        RecordHeader {
            size: body.len() as u32,
            ..RecordHeader::new(tag, dialect)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;

    #[test]
    fn test_header_sizes() {
        for dialect in [Dialect::Legacy, Dialect::Modern] {
            let mut writer = ByteWriter::new(Vec::new(), dialect);
            RecordHeader::new(tags::NPC_, dialect)
                .write(&mut writer)
                .unwrap();
            assert_eq!(writer.bytes_written(), dialect.record_header_len());
        }
    }

    #[test]
    fn test_flags_word_depends_on_dialect() {
        let mut legacy = RecordHeader::new(tags::NPC_, Dialect::Legacy);
        legacy.flags2 = 0x420;
        assert!(legacy.flags().contains(RecordFlags::DELETED | RecordFlags::PERSISTENT));

        let mut modern = RecordHeader::new(tags::MISC, Dialect::Modern);
        modern.set_flags(RecordFlags::COMPRESSED);
        assert_eq!(modern.flags1, 0x40000);
        assert_eq!(modern.form_id(), Some(0));
        assert_eq!(legacy.form_id(), None);
    }

    #[test]
    fn test_header_keeps_unknown_flag_bits() {
        let mut header = RecordHeader::new(tags::NPC_, Dialect::Legacy);
        header.flags2 = 0x8000_0008;
        let flags = header.flags();
        header.set_flags(flags);
        assert_eq!(header.flags2, 0x8000_0008);
    }

    #[test]
    fn test_subrecord_reader_walks_and_checks_size() {
        let mut body = sub(Dialect::Legacy, tags::NAME, &z("a"));
        body.extend(sub(Dialect::Legacy, tags::FNAM, &z("b")));

        let mut reader = SubrecordReader::new(&body, body.len(), tags::NPC_, Dialect::Legacy);
        let first = reader.next_header().unwrap().unwrap();
        assert_eq!(first.tag, tags::NAME);
        reader.unread();
        let again = reader.next_header().unwrap().unwrap();
        assert_eq!(again, first);
        assert_eq!(reader.payload(&again).unwrap(), b"a\0");
        let second = reader.next_header().unwrap().unwrap();
        reader.payload(&second).unwrap();
        assert!(reader.next_header().unwrap().is_none());
        assert_eq!(reader.finish().unwrap(), body.len());
    }

    #[test]
    fn test_subrecord_reader_overrun_and_underrun() {
        let body = sub(Dialect::Legacy, tags::NAME, &z("abc"));

        // Declared size cuts the payload short.
        let mut reader = SubrecordReader::new(&body, body.len() - 2, tags::NPC_, Dialect::Legacy);
        let header = reader.next_header().unwrap().unwrap();
        assert!(matches!(
            reader.payload(&header),
            Err(EsmError::Overrun { .. })
        ));

        // Declared size leaves bytes that no subrecord can use.
        let mut padded = body.clone();
        padded.extend([0, 0, 0]);
        let mut reader = SubrecordReader::new(&padded, padded.len(), tags::NPC_, Dialect::Legacy);
        let header = reader.next_header().unwrap().unwrap();
        reader.payload(&header).unwrap();
        assert!(matches!(
            reader.next_header(),
            Err(EsmError::Overrun { .. })
        ));

        // Stopping before the declared size is an underrun.
        let mut reader = SubrecordReader::new(&padded, padded.len(), tags::NPC_, Dialect::Legacy);
        let header = reader.next_header().unwrap().unwrap();
        reader.payload(&header).unwrap();
        assert!(matches!(
            reader.finish(),
            Err(EsmError::Underrun { remaining: 3, .. })
        ));
    }

    #[test]
    fn test_subrecord_reader_follows_xxxx() {
        let data = vec![7u8; 70_000];
        let raw = RawSubrecord::new(tags::DATA, data.clone());
        let mut writer = ByteWriter::new(Vec::new(), Dialect::Modern);
        raw.write(&mut writer).unwrap();
        let body = writer.into_inner();

        let mut reader = SubrecordReader::new(&body, body.len(), tags::MISC, Dialect::Modern);
        let header = reader.next_header().unwrap().unwrap();
        assert_eq!(header, SubrecordHeader { tag: tags::DATA, len: 70_000 });
        assert_eq!(reader.read_raw(&header).unwrap(), raw);
        reader.finish().unwrap();
    }

    #[test]
    fn test_double_xxxx_is_rejected() {
        let mut body = sub(Dialect::Modern, tags::XXXX, &8u32.to_le_bytes());
        body.extend(sub(Dialect::Modern, tags::XXXX, &8u32.to_le_bytes()));
        let mut reader = SubrecordReader::new(&body, body.len(), tags::MISC, Dialect::Modern);
        assert!(matches!(
            reader.next_header(),
            Err(EsmError::DuplicateTag { tag: tags::XXXX, .. })
        ));
    }

    #[test]
    fn test_truncated_body() {
        let body = sub(Dialect::Legacy, tags::NAME, &z("abc"));
        let mut reader = SubrecordReader::new(&body[..6], body.len(), tags::NPC_, Dialect::Legacy);
        assert!(matches!(
            reader.next_header(),
            Err(EsmError::Truncated { .. })
        ));
    }

    #[test]
    fn test_compressed_typed_record_is_unsupported() {
        let session = Session::unlocalized(Dialect::Modern);
        let mut header = RecordHeader::new(tags::MISC, Dialect::Modern);
        header.set_flags(RecordFlags::COMPRESSED);
        let err = Record::decode(header, &[], &session, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, EsmError::UnsupportedFeature { .. }));
    }

    #[test]
    fn test_unknown_record_is_generic() {
        let body = sub(Dialect::Legacy, tags::NAME, &z("gold_001"));
        let header = header_for(Tag::new(b"MISC"), Dialect::Legacy, &body);
        let session = Session::unlocalized(Dialect::Legacy);
        let record = Record::decode(header, &body, &session, &mut Vec::new()).unwrap();
        assert!(matches!(record, Record::Generic(_)));

        let mut writer = ByteWriter::new(Vec::new(), Dialect::Legacy);
        record.encode(&mut writer, &session, &mut Vec::new()).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(&bytes[16..], &body[..]);
    }
}
