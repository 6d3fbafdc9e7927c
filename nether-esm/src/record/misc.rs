//! Modern miscellaneous item record (`MISC`)

use std::io::Write;
use std::sync::OnceLock;

use serde::Serialize;

use crate::cursor::{ByteCursor, ByteWriter};
use crate::error::{EsmError, Result, Warning, WarningSink};
use crate::fixed::{FixedBlock, FixedLen, read_fixed, write_fixed};
use crate::localized::{Session, StringValue, read_localized, write_localized};
use crate::presence::{PresenceTracker, TagSchema};
use crate::string::decode_string;
use crate::tag::{Tag, tags};

use super::{RawSubrecord, RecordCodec, RecordHeader, SubrecordReader, put_string};

/// `OBND`: axis-aligned bounds in object space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObjectBounds {
    pub min: [i16; 3],
    pub max: [i16; 3],
}

impl FixedBlock for ObjectBounds {
    const LEN: FixedLen = FixedLen::Exact(12);

    fn decode(cursor: &mut ByteCursor<'_>, _len: usize, _: &mut WarningSink<'_>) -> Result<Self> {
        let mut bounds = ObjectBounds::default();
        for value in bounds.min.iter_mut().chain(bounds.max.iter_mut()) {
            *value = cursor.read_i16()?;
        }
        Ok(bounds)
    }

    fn encode<W: Write>(&self, writer: &mut ByteWriter<W>, _: &mut WarningSink<'_>) -> Result<()> {
        for &value in self.min.iter().chain(&self.max) {
            writer.write_i16(value)?;
        }
        Ok(())
    }
}

/// `DATA`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MiscData {
    pub value: u32,
    pub weight: f32,
}

impl FixedBlock for MiscData {
    const LEN: FixedLen = FixedLen::Exact(8);

    fn decode(cursor: &mut ByteCursor<'_>, _len: usize, _: &mut WarningSink<'_>) -> Result<Self> {
        Ok(MiscData {
            value: cursor.read_u32()?,
            weight: cursor.read_f32()?,
        })
    }

    fn encode<W: Write>(&self, writer: &mut ByteWriter<W>, _: &mut WarningSink<'_>) -> Result<()> {
        writer.write_u32(self.value)?;
        writer.write_f32(self.weight)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MiscRecord {
    pub header: RecordHeader,
    /// `EDID`
    pub editor_id: String,
    /// `VMAD` script attachment, kept opaque
    pub vm_attachment: Option<RawSubrecord>,
    pub bounds: ObjectBounds,
    /// `FULL`
    pub name: Option<StringValue>,
    /// `MODL`
    pub model: Option<String>,
    /// `MODT` texture hashes, kept opaque
    pub model_textures: Option<RawSubrecord>,
    /// `ICON`
    pub icon: Option<String>,
    /// `YNAM`
    pub pickup_sound: Option<u32>,
    /// `ZNAM`
    pub putdown_sound: Option<u32>,
    /// `KSIZ` + `KWDA` form ids; `None` when the record has no `KSIZ`
    pub keywords: Option<Vec<u32>>,
    pub data: MiscData,
}

fn schema() -> &'static TagSchema {
    static SCHEMA: OnceLock<TagSchema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        TagSchema::new(tags::MISC)
            .required(&[tags::EDID, tags::OBND, tags::DATA])
            .optional(&[
                tags::VMAD,
                tags::FULL,
                tags::MODL,
                tags::MODT,
                tags::ICON,
                tags::YNAM,
                tags::ZNAM,
                tags::KSIZ,
                tags::KWDA,
            ])
    })
}

fn read_keywords(payload: &[u8], count: usize) -> Result<Vec<u32>> {
    if payload.len() != count * 4 {
        return Err(EsmError::LengthMismatch {
            tag: tags::KWDA,
            expected: FixedLen::Exact(count * 4),
            found: payload.len(),
        });
    }
    let mut cursor = ByteCursor::new(payload);
    (0..count).map(|_| cursor.read_u32()).collect()
}

impl RecordCodec for MiscRecord {
    const TAG: Tag = tags::MISC;

    fn decode(
        header: RecordHeader,
        body: &mut SubrecordReader<'_>,
        session: &Session<'_>,
        warnings: &mut Vec<Warning>,
    ) -> Result<Self> {
        let dialect = body.dialect();
        let mut presence = PresenceTracker::new(schema());

        let mut editor_id = String::new();
        let mut vm_attachment = None;
        let mut bounds = None;
        let mut name = None;
        let mut model = None;
        let mut model_textures = None;
        let mut icon = None;
        let mut pickup_sound = None;
        let mut putdown_sound = None;
        let mut keyword_count = None;
        let mut keywords = None;
        let mut data = None;
        let mut previous = None;

        while let Some(sub) = body.next_header()? {
            let tag = sub.tag;
            if !presence.is_seen(tags::EDID) && tag != tags::EDID {
                return Err(EsmError::UnexpectedTag {
                    record: Self::TAG,
                    tag,
                });
            }
            presence.mark_seen(tag)?;

            match tag {
                tags::VMAD => vm_attachment = Some(body.read_raw(&sub)?),
                tags::MODT => model_textures = Some(body.read_raw(&sub)?),
                tags::KWDA => {
                    let Some(count) = keyword_count.filter(|_| previous == Some(tags::KSIZ)) else {
                        return Err(EsmError::MisplacedAttachment { tag, previous });
                    };
                    keywords = Some(read_keywords(body.payload(&sub)?, count)?);
                }
                _ => {
                    let payload = body.payload(&sub)?;
                    match tag {
                        tags::EDID => editor_id = decode_string(payload, tag, dialect)?,
                        tags::OBND => bounds = Some(read_fixed(payload, tag, warnings)?),
                        tags::FULL => name = Some(read_localized(payload, tag, session)?),
                        tags::MODL => model = Some(decode_string(payload, tag, dialect)?),
                        tags::ICON => icon = Some(decode_string(payload, tag, dialect)?),
                        tags::YNAM => pickup_sound = Some(read_fixed(payload, tag, warnings)?),
                        tags::ZNAM => putdown_sound = Some(read_fixed(payload, tag, warnings)?),
                        tags::KSIZ => {
                            let count = read_fixed::<u32>(payload, tag, warnings)? as usize;
                            keyword_count = Some(count);
                            if count == 0 {
                                keywords = Some(Vec::new());
                            }
                        }
                        tags::DATA => data = Some(read_fixed(payload, tag, warnings)?),
                        _ => {
                            return Err(EsmError::UnexpectedTag {
                                record: Self::TAG,
                                tag,
                            });
                        }
                    }
                }
            }
            previous = Some(tag);
        }
        presence.check_required()?;

        let missing = |tag| EsmError::MissingRequiredTag {
            record: Self::TAG,
            tag,
        };
        if keyword_count.is_some() && keywords.is_none() {
            return Err(missing(tags::KWDA));
        }
        Ok(MiscRecord {
            header,
            editor_id,
            vm_attachment,
            bounds: bounds.ok_or_else(|| missing(tags::OBND))?,
            name,
            model,
            model_textures,
            icon,
            pickup_sound,
            putdown_sound,
            keywords,
            data: data.ok_or_else(|| missing(tags::DATA))?,
        })
    }

    fn encode_body<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        session: &Session<'_>,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        put_string(writer, tags::EDID, &self.editor_id, warnings)?;
        if let Some(vmad) = &self.vm_attachment {
            vmad.write(writer)?;
        }
        write_fixed(writer, tags::OBND, &self.bounds, warnings)?;
        if let Some(name) = &self.name {
            write_localized(
                writer,
                tags::FULL,
                name,
                session,
                &mut WarningSink::new(tags::FULL, warnings),
            )?;
        }
        if let Some(model) = &self.model {
            put_string(writer, tags::MODL, model, warnings)?;
        }
        if let Some(modt) = &self.model_textures {
            modt.write(writer)?;
        }
        if let Some(icon) = &self.icon {
            put_string(writer, tags::ICON, icon, warnings)?;
        }
        if let Some(sound) = &self.pickup_sound {
            write_fixed(writer, tags::YNAM, sound, warnings)?;
        }
        if let Some(sound) = &self.putdown_sound {
            write_fixed(writer, tags::ZNAM, sound, warnings)?;
        }
        if let Some(keywords) = &self.keywords {
            let count = u32::try_from(keywords.len()).map_err(|_| EsmError::LengthOverflow {
                tag: tags::KSIZ,
                len: keywords.len(),
            })?;
            write_fixed(writer, tags::KSIZ, &count, warnings)?;
            if !keywords.is_empty() {
                writer.write_subrecord_header(tags::KWDA, keywords.len() * 4)?;
                for &keyword in keywords {
                    writer.write_u32(keyword)?;
                }
            }
        }
        write_fixed(writer, tags::DATA, &self.data, warnings)
    }

    fn header(&self) -> &RecordHeader {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::localized::NoStrings;
    use crate::record::test_util::{header_for, sub, z};
    use crate::record::{decode_record, encode_record};
    use crate::string_table::StringTableMap;

    const M: Dialect = Dialect::Modern;

    fn bounds() -> Vec<u8> {
        [-3i16, -3, 0, 3, 3, 1]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }

    fn data() -> Vec<u8> {
        let mut data = 25u32.to_le_bytes().to_vec();
        data.extend(0.5f32.to_le_bytes());
        data
    }

    fn body(full: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(sub(M, tags::EDID, &z("Gold001")));
        body.extend(sub(M, tags::VMAD, &[5, 0, 2, 0, 0, 0]));
        body.extend(sub(M, tags::OBND, &bounds()));
        body.extend(sub(M, tags::FULL, full));
        body.extend(sub(M, tags::MODL, &z("Clutter\\Coin01.nif")));
        body.extend(sub(M, tags::YNAM, &0x0003_E9F6u32.to_le_bytes()));
        body.extend(sub(M, tags::KSIZ, &2u32.to_le_bytes()));
        let mut kwda = 0x0009_14E9u32.to_le_bytes().to_vec();
        kwda.extend(0x000A_8668u32.to_le_bytes());
        body.extend(sub(M, tags::KWDA, &kwda));
        body.extend(sub(M, tags::DATA, &data()));
        body
    }

    fn decode(body: &[u8], session: &Session<'_>) -> Result<MiscRecord> {
        decode_record(header_for(tags::MISC, M, body), body, session, &mut Vec::new())
    }

    fn encode(record: &MiscRecord, session: &Session<'_>) -> Vec<u8> {
        let mut writer = ByteWriter::new(Vec::new(), M);
        encode_record(record, &mut writer, session, &mut Vec::new()).unwrap();
        writer.into_inner()
    }

    #[test]
    fn test_unlocalized_round_trip() {
        let session = Session::unlocalized(M);
        let body = body(&z("Gold"));
        let misc = decode(&body, &session).unwrap();
        assert_eq!(misc.editor_id, "Gold001");
        assert_eq!(misc.name, Some(StringValue::inline("Gold")));
        assert_eq!(misc.bounds.min, [-3, -3, 0]);
        assert_eq!(misc.keywords, Some(vec![0x0009_14E9, 0x000A_8668]));
        assert_eq!(misc.data.value, 25);
        assert_eq!(misc.vm_attachment.as_ref().map(|v| v.data.len()), Some(6));

        let bytes = encode(&misc, &session);
        assert_eq!(&bytes[..4], b"MISC");
        assert_eq!(&bytes[24..], &body[..]);
    }

    #[test]
    fn test_localized_name() {
        let mut table = StringTableMap::new();
        table.add_string(0x40, "Gold");
        let session = Session::new(M, true, &table);
        let body = body(&0x40u32.to_le_bytes());
        let misc = decode(&body, &session).unwrap();
        assert_eq!(misc.name.as_ref().map(StringValue::text), Some("Gold"));
        assert_eq!(&encode(&misc, &session)[24..], &body[..]);

        let empty = Session::new(M, true, &NoStrings);
        assert!(matches!(
            decode(&body, &empty),
            Err(EsmError::StringTableMiss { index: 0x40, .. })
        ));
    }

    #[test]
    fn test_keyword_count_must_match() {
        let session = Session::unlocalized(M);
        let mut body = sub(M, tags::EDID, &z("Gold001"));
        body.extend(sub(M, tags::OBND, &bounds()));
        body.extend(sub(M, tags::KSIZ, &3u32.to_le_bytes()));
        body.extend(sub(M, tags::KWDA, &[0; 8]));
        body.extend(sub(M, tags::DATA, &data()));
        assert!(matches!(
            decode(&body, &session),
            Err(EsmError::LengthMismatch {
                tag: tags::KWDA,
                found: 8,
                ..
            })
        ));
    }

    #[test]
    fn test_keywords_must_follow_count() {
        let session = Session::unlocalized(M);
        let mut body = sub(M, tags::EDID, &z("Gold001"));
        body.extend(sub(M, tags::OBND, &bounds()));
        body.extend(sub(M, tags::KWDA, &[0; 8]));
        assert!(matches!(
            decode(&body, &session),
            Err(EsmError::MisplacedAttachment {
                tag: tags::KWDA,
                previous: Some(tags::OBND)
            })
        ));
    }

    #[test]
    fn test_editor_id_must_come_first() {
        let session = Session::unlocalized(M);
        let mut body = sub(M, tags::OBND, &bounds());
        body.extend(sub(M, tags::EDID, &z("Gold001")));
        assert!(matches!(
            decode(&body, &session),
            Err(EsmError::UnexpectedTag { tag: tags::OBND, .. })
        ));
    }
}
