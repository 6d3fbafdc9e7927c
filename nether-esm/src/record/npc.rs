//! Legacy NPC record (`NPC_`)

use std::io::Write;
use std::sync::OnceLock;

use serde::{Serialize, Serializer};

use crate::cursor::{ByteCursor, ByteWriter};
use crate::error::{EsmError, Result, Warning, WarningSink};
use crate::fixed::{FixedBlock, FixedLen, read_fixed, write_fixed};
use crate::localized::Session;
use crate::presence::{PresenceTracker, TagSchema};
use crate::string::decode_string;
use crate::tag::{Tag, tags};

use super::actor::{ActorData, ActorDataDecoder};
use super::{RecordCodec, RecordHeader, SubrecordReader, put_string};

bitflags::bitflags! {
    /// `FLAG` word of an NPC
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NpcFlags: u32 {
        const FEMALE = 0x0001;
        const ESSENTIAL = 0x0002;
        const RESPAWN = 0x0004;
        const AUTO_CALC = 0x0010;
        const WHITE_BLOOD = 0x0400;
        const GOLD_BLOOD = 0x0800;
    }
}

impl Serialize for NpcFlags {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

/// `NPDT`: either the full stat block or the short form used with auto-calculated stats
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "form", rename_all = "lowercase")]
pub enum NpcStats {
    /// 12 bytes
    Short {
        level: u16,
        disposition: u8,
        faction_rank_id: u8,
        rank: u8,
        unknown1: u8,
        unknown2: [u8; 2],
        gold: i32,
    },
    /// 52 bytes
    Full {
        level: u16,
        /// Strength, intelligence, willpower, agility, speed, endurance, personality, luck
        attributes: [u8; 8],
        skills: [u8; 27],
        reputation: u8,
        health: u16,
        spell_points: u16,
        fatigue: u16,
        disposition: u8,
        faction_rank_id: u8,
        rank: u8,
        unknown1: u8,
        gold: i32,
    },
}

impl NpcStats {
    pub fn level(&self) -> u16 {
        match self {
            NpcStats::Short { level, .. } | NpcStats::Full { level, .. } => *level,
        }
    }

    pub fn gold(&self) -> i32 {
        match self {
            NpcStats::Short { gold, .. } | NpcStats::Full { gold, .. } => *gold,
        }
    }
}

impl FixedBlock for NpcStats {
    const LEN: FixedLen = FixedLen::OneOf(&[12, 52]);

    fn decode(cursor: &mut ByteCursor<'_>, len: usize, _: &mut WarningSink<'_>) -> Result<Self> {
        let level = cursor.read_u16()?;
        if len == 12 {
            return Ok(NpcStats::Short {
                level,
                disposition: cursor.read_u8()?,
                faction_rank_id: cursor.read_u8()?,
                rank: cursor.read_u8()?,
                unknown1: cursor.read_u8()?,
                unknown2: cursor.read_array()?,
                gold: cursor.read_i32()?,
            });
        }
        Ok(NpcStats::Full {
            level,
            attributes: cursor.read_array()?,
            skills: cursor.read_array()?,
            reputation: cursor.read_u8()?,
            health: cursor.read_u16()?,
            spell_points: cursor.read_u16()?,
            fatigue: cursor.read_u16()?,
            disposition: cursor.read_u8()?,
            faction_rank_id: cursor.read_u8()?,
            rank: cursor.read_u8()?,
            unknown1: cursor.read_u8()?,
            gold: cursor.read_i32()?,
        })
    }

    fn encode<W: Write>(&self, writer: &mut ByteWriter<W>, _: &mut WarningSink<'_>) -> Result<()> {
        match self {
            NpcStats::Short {
                level,
                disposition,
                faction_rank_id,
                rank,
                unknown1,
                unknown2,
                gold,
            } => {
                writer.write_u16(*level)?;
                writer.write_bytes(&[*disposition, *faction_rank_id, *rank, *unknown1])?;
                writer.write_bytes(unknown2)?;
                writer.write_i32(*gold)
            }
            NpcStats::Full {
                level,
                attributes,
                skills,
                reputation,
                health,
                spell_points,
                fatigue,
                disposition,
                faction_rank_id,
                rank,
                unknown1,
                gold,
            } => {
                writer.write_u16(*level)?;
                writer.write_bytes(attributes)?;
                writer.write_bytes(skills)?;
                writer.write_u8(*reputation)?;
                writer.write_u16(*health)?;
                writer.write_u16(*spell_points)?;
                writer.write_u16(*fatigue)?;
                writer.write_bytes(&[*disposition, *faction_rank_id, *rank, *unknown1])?;
                writer.write_i32(*gold)
            }
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            NpcStats::Short { .. } => 12,
            NpcStats::Full { .. } => 52,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NpcRecord {
    pub header: RecordHeader,
    /// `NAME`
    pub id: String,
    /// `FNAM`
    pub name: Option<String>,
    /// `MODL`
    pub model: Option<String>,
    /// `RNAM`
    pub race: String,
    /// `CNAM`
    pub class: Option<String>,
    /// `ANAM`
    pub faction: String,
    /// `BNAM`
    pub head: String,
    /// `KNAM`
    pub hair: String,
    /// `SCRI`
    pub script: Option<String>,
    pub stats: NpcStats,
    pub flags: NpcFlags,
    /// `XSCL`
    pub scale: Option<f32>,
    #[serde(flatten)]
    pub actor: ActorData,
}

fn schema() -> &'static TagSchema {
    static SCHEMA: OnceLock<TagSchema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        TagSchema::new(tags::NPC_)
            .repeatable(ActorData::TAGS)
            .optional(&[
                tags::FNAM,
                tags::MODL,
                tags::CNAM,
                tags::SCRI,
                tags::AIDT,
                tags::XSCL,
            ])
            .required(&[
                tags::NAME,
                tags::RNAM,
                tags::ANAM,
                tags::BNAM,
                tags::KNAM,
                tags::NPDT,
                tags::FLAG,
            ])
    })
}

impl RecordCodec for NpcRecord {
    const TAG: Tag = tags::NPC_;

    fn decode(
        header: RecordHeader,
        body: &mut SubrecordReader<'_>,
        _session: &Session<'_>,
        warnings: &mut Vec<Warning>,
    ) -> Result<Self> {
        let dialect = body.dialect();
        let mut presence = PresenceTracker::new(schema());
        let mut actor = ActorDataDecoder::new(Self::TAG);

        let mut id = String::new();
        let mut name = None;
        let mut model = None;
        let mut race = String::new();
        let mut class = None;
        let mut faction = String::new();
        let mut head = String::new();
        let mut hair = String::new();
        let mut script = None;
        let mut stats = None;
        let mut flags = None;
        let mut scale = None;

        while let Some(sub) = body.next_header()? {
            let tag = sub.tag;
            if !presence.is_seen(tags::NAME) && tag != tags::NAME {
                return Err(EsmError::UnexpectedTag {
                    record: Self::TAG,
                    tag,
                });
            }
            presence.mark_seen(tag)?;
            let payload = body.payload(&sub)?;
            if actor.decode(tag, payload, dialect, warnings)? {
                continue;
            }

            match tag {
                tags::NAME => id = decode_string(payload, tag, dialect)?,
                tags::FNAM => name = Some(decode_string(payload, tag, dialect)?),
                tags::MODL => model = Some(decode_string(payload, tag, dialect)?),
                tags::RNAM => race = decode_string(payload, tag, dialect)?,
                tags::CNAM => class = Some(decode_string(payload, tag, dialect)?),
                tags::ANAM => faction = decode_string(payload, tag, dialect)?,
                tags::BNAM => head = decode_string(payload, tag, dialect)?,
                tags::KNAM => hair = decode_string(payload, tag, dialect)?,
                tags::SCRI => script = Some(decode_string(payload, tag, dialect)?),
                tags::NPDT => stats = Some(read_fixed::<NpcStats>(payload, tag, warnings)?),
                tags::FLAG => flags = Some(read_fixed::<u32>(payload, tag, warnings)?),
                tags::XSCL => scale = Some(read_fixed::<f32>(payload, tag, warnings)?),
                _ => {
                    return Err(EsmError::UnexpectedTag {
                        record: Self::TAG,
                        tag,
                    });
                }
            }
        }
        presence.check_required()?;

        let missing = |tag| EsmError::MissingRequiredTag {
            record: Self::TAG,
            tag,
        };
        Ok(NpcRecord {
            header,
            id,
            name,
            model,
            race,
            class,
            faction,
            head,
            hair,
            script,
            stats: stats.ok_or_else(|| missing(tags::NPDT))?,
            flags: NpcFlags::from_bits_retain(flags.ok_or_else(|| missing(tags::FLAG))?),
            scale,
            actor: actor.finish(),
        })
    }

    fn encode_body<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        _session: &Session<'_>,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        put_string(writer, tags::NAME, &self.id, warnings)?;
        if let Some(name) = &self.name {
            put_string(writer, tags::FNAM, name, warnings)?;
        }
        if let Some(model) = &self.model {
            put_string(writer, tags::MODL, model, warnings)?;
        }
        put_string(writer, tags::RNAM, &self.race, warnings)?;
        put_string(writer, tags::ANAM, &self.faction, warnings)?;
        put_string(writer, tags::BNAM, &self.head, warnings)?;
        if let Some(class) = &self.class {
            put_string(writer, tags::CNAM, class, warnings)?;
        }
        put_string(writer, tags::KNAM, &self.hair, warnings)?;
        if let Some(script) = &self.script {
            put_string(writer, tags::SCRI, script, warnings)?;
        }
        write_fixed(writer, tags::NPDT, &self.stats, warnings)?;
        write_fixed(writer, tags::FLAG, &self.flags.bits(), warnings)?;
        if let Some(scale) = &self.scale {
            write_fixed(writer, tags::XSCL, scale, warnings)?;
        }
        self.actor.encode(writer, warnings)
    }

    fn header(&self) -> &RecordHeader {
        &self.header
    }
}
