//! Records without a typed layout, kept subrecord by subrecord

use std::io::Write;

use serde::Serialize;

use crate::cursor::ByteWriter;
use crate::error::{EsmError, Result, Warning};
use crate::localized::Session;
use crate::tag::Tag;

use super::{RawSubrecord, RecordCodec, RecordHeader, SubrecordReader, write_with_body};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenericBody {
    Subrecords { subrecords: Vec<RawSubrecord> },
    /// zlib-compressed body, never inflated
    Compressed {
        #[serde(skip)]
        data: Vec<u8>,
    },
}

/// A record of a type this crate has no layout for.
///
/// Writing it back reproduces the original bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericRecord {
    pub header: RecordHeader,
    pub body: GenericBody,
}

impl GenericRecord {
    /// Keep a compressed body opaque
    pub fn compressed(header: RecordHeader, body: &[u8]) -> Result<Self> {
        let size = header.size as usize;
        let data = body.get(..size).ok_or(EsmError::Truncated {
            needed: size,
            available: body.len(),
        })?;
        Ok(Self {
            header,
            body: GenericBody::Compressed {
                data: data.to_vec(),
            },
        })
    }

    pub fn subrecords(&self) -> &[RawSubrecord] {
        match &self.body {
            GenericBody::Subrecords { subrecords } => subrecords,
            GenericBody::Compressed { .. } => &[],
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.body, GenericBody::Compressed { .. })
    }

    /// First subrecord with `tag`
    pub fn find(&self, tag: Tag) -> Option<&RawSubrecord> {
        self.subrecords().iter().find(|sub| sub.tag == tag)
    }

    pub fn encode<W: Write>(&self, writer: &mut ByteWriter<W>) -> Result<()> {
        let mut body = ByteWriter::new(Vec::new(), writer.dialect());
        self.write_body(&mut body)?;
        write_with_body(writer, &self.header, &body.into_inner())
    }

    fn write_body<W: Write>(&self, writer: &mut ByteWriter<W>) -> Result<()> {
        match &self.body {
            GenericBody::Subrecords { subrecords } => {
                for sub in subrecords {
                    sub.write(writer)?;
                }
                Ok(())
            }
            GenericBody::Compressed { data } => writer.write_bytes(data),
        }
    }
}

impl RecordCodec for GenericRecord {
    // Never dispatched on; generic records accept any tag.
    const TAG: Tag = Tag(*b"____");

    fn decode(
        header: RecordHeader,
        body: &mut SubrecordReader<'_>,
        _session: &Session<'_>,
        _warnings: &mut Vec<Warning>,
    ) -> Result<Self> {
        let mut subrecords = Vec::new();
        while let Some(sub) = body.next_header()? {
            subrecords.push(body.read_raw(&sub)?);
        }
        Ok(Self {
            header,
            body: GenericBody::Subrecords { subrecords },
        })
    }

    fn encode_body<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        _session: &Session<'_>,
        _warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        self.write_body(writer)
    }

    fn header(&self) -> &RecordHeader {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::record::decode_record;
    use crate::record::test_util::{header_for, sub, z};
    use crate::tags;

    #[test]
    fn test_keeps_subrecords_in_order() {
        let mut body = sub(Dialect::Modern, tags::EDID, &z("DoorTest"));
        body.extend(sub(Dialect::Modern, tags::DATA, &[1, 2, 3]));
        body.extend(sub(Dialect::Modern, tags::EDID, &z("again")));
        let door = Tag::new(b"DOOR");
        let session = Session::unlocalized(Dialect::Modern);
        let record: GenericRecord = decode_record(
            header_for(door, Dialect::Modern, &body),
            &body,
            &session,
            &mut Vec::new(),
        )
        .unwrap();

        let order: Vec<Tag> = record.subrecords().iter().map(|s| s.tag).collect();
        assert_eq!(order, [tags::EDID, tags::DATA, tags::EDID]);
        assert_eq!(record.find(tags::DATA).map(|s| &s.data[..]), Some(&[1, 2, 3][..]));

        let mut writer = ByteWriter::new(Vec::new(), Dialect::Modern);
        record.encode(&mut writer).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(&bytes[..4], b"DOOR");
        assert_eq!(&bytes[4..8], &(body.len() as u32).to_le_bytes());
        assert_eq!(&bytes[24..], &body[..]);
    }

    #[test]
    fn test_compressed_body_is_opaque() {
        let mut header = RecordHeader::new(Tag::new(b"NAVM"), Dialect::Modern);
        header.size = 6;
        let record = GenericRecord::compressed(header.clone(), &[9; 8]).unwrap();
        assert!(record.is_compressed());
        assert!(record.subrecords().is_empty());

        let mut writer = ByteWriter::new(Vec::new(), Dialect::Modern);
        record.encode(&mut writer).unwrap();
        assert_eq!(&writer.into_inner()[24..], &[9; 6]);

        assert!(matches!(
            GenericRecord::compressed(header, &[9; 4]),
            Err(EsmError::Truncated {
                needed: 6,
                available: 4
            })
        ));
    }
}
