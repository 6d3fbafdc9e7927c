//! Legacy creature record (`CREA`)

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
    /// `FLAG` word of a creature
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CreatureFlags: u32 {
        const BIPED = 0x0001;
        const RESPAWN = 0x0002;
        const WEAPON_AND_SHIELD = 0x0004;
        const SWIMS = 0x0010;
        const FLIES = 0x0020;
        const WALKS = 0x0040;
        const ESSENTIAL = 0x0080;
        const SKELETON_BLOOD = 0x0400;
        const METAL_BLOOD = 0x0800;
    }
}

impl Serialize for CreatureFlags {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

/// `NPDT` of a creature: 24 little-endian `i32`s
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreatureData {
    /// 0 creature, 1 daedra, 2 undead, 3 humanoid
    pub creature_type: i32,
    pub level: i32,
    pub attributes: [i32; 8],
    pub health: i32,
    pub spell_points: i32,
    pub fatigue: i32,
    pub soul: i32,
    pub combat: i32,
    pub magic: i32,
    pub stealth: i32,
    /// Min/max damage of the three attacks
    pub attacks: [[i32; 2]; 3],
    pub gold: i32,
}

impl FixedBlock for CreatureData {
    const LEN: FixedLen = FixedLen::Exact(96);

    fn decode(cursor: &mut ByteCursor<'_>, _len: usize, _: &mut WarningSink<'_>) -> Result<Self> {
        let creature_type = cursor.read_i32()?;
        let level = cursor.read_i32()?;
        let mut attributes = [0; 8];
        for value in &mut attributes {
            *value = cursor.read_i32()?;
        }
        let health = cursor.read_i32()?;
        let spell_points = cursor.read_i32()?;
        let fatigue = cursor.read_i32()?;
        let soul = cursor.read_i32()?;
        let combat = cursor.read_i32()?;
        let magic = cursor.read_i32()?;
        let stealth = cursor.read_i32()?;
        let mut attacks = [[0; 2]; 3];
        for attack in &mut attacks {
            attack[0] = cursor.read_i32()?;
            attack[1] = cursor.read_i32()?;
        }
        Ok(CreatureData {
            creature_type,
            level,
            attributes,
            health,
            spell_points,
            fatigue,
            soul,
            combat,
            magic,
            stealth,
            attacks,
            gold: cursor.read_i32()?,
        })
    }

    fn encode<W: Write>(&self, writer: &mut ByteWriter<W>, _: &mut WarningSink<'_>) -> Result<()> {
        writer.write_i32(self.creature_type)?;
        writer.write_i32(self.level)?;
        for &value in &self.attributes {
            writer.write_i32(value)?;
        }
        for value in [
            self.health,
            self.spell_points,
            self.fatigue,
            self.soul,
            self.combat,
            self.magic,
            self.stealth,
        ] {
            writer.write_i32(value)?;
        }
        for &[min, max] in &self.attacks {
            writer.write_i32(min)?;
            writer.write_i32(max)?;
        }
        writer.write_i32(self.gold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatureRecord {
    pub header: RecordHeader,
    /// `NAME`
    pub id: String,
    /// `MODL`
    pub model: String,
    /// `CNAM`: creature whose sounds this one uses
    pub sound_gen_creature: Option<String>,
    /// `FNAM`
    pub name: String,
    /// `SCRI`
    pub script: Option<String>,
    pub data: CreatureData,
    pub flags: CreatureFlags,
    /// `XSCL`
    pub scale: Option<f32>,
    #[serde(flatten)]
    pub actor: ActorData,
}

fn schema() -> &'static TagSchema {
    static SCHEMA: OnceLock<TagSchema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        TagSchema::new(tags::CREA)
            .repeatable(ActorData::TAGS)
            .optional(&[tags::CNAM, tags::SCRI, tags::AIDT, tags::XSCL])
            .required(&[tags::NAME, tags::MODL, tags::FNAM, tags::NPDT, tags::FLAG])
    })
}

impl RecordCodec for CreatureRecord {
    const TAG: Tag = tags::CREA;

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
        let mut model = String::new();
        let mut sound_gen_creature = None;
        let mut name = String::new();
        let mut script = None;
        let mut data = None;
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
                tags::MODL => model = decode_string(payload, tag, dialect)?,
                tags::CNAM => sound_gen_creature = Some(decode_string(payload, tag, dialect)?),
                tags::FNAM => name = decode_string(payload, tag, dialect)?,
                tags::SCRI => script = Some(decode_string(payload, tag, dialect)?),
                tags::NPDT => data = Some(read_fixed::<CreatureData>(payload, tag, warnings)?),
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
        Ok(CreatureRecord {
            header,
            id,
            model,
            sound_gen_creature,
            name,
            script,
            data: data.ok_or_else(|| missing(tags::NPDT))?,
            flags: CreatureFlags::from_bits_retain(flags.ok_or_else(|| missing(tags::FLAG))?),
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
        put_string(writer, tags::MODL, &self.model, warnings)?;
        if let Some(sound_gen) = &self.sound_gen_creature {
            put_string(writer, tags::CNAM, sound_gen, warnings)?;
        }
        put_string(writer, tags::FNAM, &self.name, warnings)?;
        if let Some(script) = &self.script {
            put_string(writer, tags::SCRI, script, warnings)?;
        }
        write_fixed(writer, tags::NPDT, &self.data, warnings)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::record::test_util::{header_for, sub, z};
    use crate::record::{decode_record, encode_record};

    const L: Dialect = Dialect::Legacy;

    fn creature_data() -> Vec<u8> {
        (0..24i32).flat_map(|v| v.to_le_bytes()).collect()
    }

    fn body() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(sub(L, tags::NAME, &z("mudcrab")));
        body.extend(sub(L, tags::MODL, &z("r\\MudCrab.NIF")));
        body.extend(sub(L, tags::FNAM, &z("Mudcrab")));
        body.extend(sub(L, tags::NPDT, &creature_data()));
        body.extend(sub(L, tags::FLAG, &0x48u32.to_le_bytes()));
        body.extend(sub(L, tags::XSCL, &1.5f32.to_le_bytes()));
        body.extend(sub(L, tags::AIDT, &[0; 12]));
        let mut wander = vec![0u8; 14];
        wander[1] = 2;
        body.extend(sub(L, tags::AI_W, &wander));
        body
    }

    fn decode(body: &[u8]) -> Result<CreatureRecord> {
        let session = Session::unlocalized(L);
        decode_record(header_for(tags::CREA, L, body), body, &session, &mut Vec::new())
    }

    #[test]
    fn test_decode_creature() {
        let crea = decode(&body()).unwrap();
        assert_eq!(crea.id, "mudcrab");
        assert_eq!(crea.data.level, 1);
        assert_eq!(crea.data.attributes[0], 2);
        assert_eq!(crea.data.attacks[2], [21, 22]);
        assert_eq!(crea.data.gold, 23);
        assert!(crea.flags.contains(CreatureFlags::WALKS));
        assert_eq!(crea.scale, Some(1.5));
        assert!(crea.actor.ai_data.is_some());
        assert_eq!(crea.actor.packages.len(), 1);
    }

    #[test]
    fn test_round_trip() {
        let body = body();
        let crea = decode(&body).unwrap();
        let session = Session::unlocalized(L);
        let mut writer = ByteWriter::new(Vec::new(), L);
        encode_record(&crea, &mut writer, &session, &mut Vec::new()).unwrap();
        assert_eq!(&writer.into_inner()[16..], &body[..]);
    }

    #[test]
    fn test_model_is_required() {
        let mut body = sub(L, tags::NAME, &z("mudcrab"));
        body.extend(sub(L, tags::FNAM, &z("Mudcrab")));
        body.extend(sub(L, tags::NPDT, &creature_data()));
        body.extend(sub(L, tags::FLAG, &0u32.to_le_bytes()));
        assert!(matches!(
            decode(&body),
            Err(EsmError::MissingRequiredTag { tag: tags::MODL, .. })
        ));
    }

    #[test]
    fn test_npc_only_tag_is_rejected() {
        let mut body = body();
        body.extend(sub(L, tags::RNAM, &z("Dark Elf")));
        assert!(matches!(
            decode(&body),
            Err(EsmError::UnexpectedTag {
                record: tags::CREA,
                tag: tags::RNAM
            })
        ));
    }
}
