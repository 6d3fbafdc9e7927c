//! Subrecords shared by the legacy actor records (`NPC_`, `CREA`)

use std::io::Write;

use serde::Serialize;

use crate::cursor::{ByteCursor, ByteWriter};
use crate::destination::{Destination, DestinationCollector};
use crate::dialect::Dialect;
use crate::error::{Result, Warning, WarningSink};
use crate::fixed::{FixedBlock, FixedLen, read_fixed, write_fixed};
use crate::package::{BehaviorPackageGroup, PackageDispatcher};
use crate::string::{NAME_SLOT_LEN, decode_name_slot, write_name_slot};
use crate::tag::{Tag, tags};

/// `NPCO`: carried item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventoryItem {
    pub count: i32,
    pub id: String,
}

impl FixedBlock for InventoryItem {
    const LEN: FixedLen = FixedLen::Exact(36);

    fn decode(
        cursor: &mut ByteCursor<'_>,
        _len: usize,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Self> {
        let count = cursor.read_i32()?;
        let id = decode_name_slot(cursor.read_exact(NAME_SLOT_LEN)?, warnings);
        Ok(InventoryItem { count, id })
    }

    fn encode<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        warnings: &mut WarningSink<'_>,
    ) -> Result<()> {
        writer.write_i32(self.count)?;
        write_name_slot(writer, &self.id, NAME_SLOT_LEN, warnings)
    }
}

/// `NPCS`: one 32-byte spell id slot
struct SpellSlot(String);

impl FixedBlock for SpellSlot {
    const LEN: FixedLen = FixedLen::Exact(NAME_SLOT_LEN);

    fn decode(
        cursor: &mut ByteCursor<'_>,
        _len: usize,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Self> {
        Ok(SpellSlot(decode_name_slot(
            cursor.read_exact(NAME_SLOT_LEN)?,
            warnings,
        )))
    }

    fn encode<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        warnings: &mut WarningSink<'_>,
    ) -> Result<()> {
        write_name_slot(writer, &self.0, NAME_SLOT_LEN, warnings)
    }
}

/// `AIDT`: AI settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AiData {
    pub hello: u8,
    pub unknown1: u8,
    pub fight: u8,
    pub flee: u8,
    pub alarm: u8,
    pub unknown2: u8,
    pub unknown3: u8,
    pub unknown4: u8,
    /// Services offered (barter categories, training, spells, ...)
    pub flags: u32,
}

impl FixedBlock for AiData {
    const LEN: FixedLen = FixedLen::Exact(12);

    fn decode(cursor: &mut ByteCursor<'_>, _len: usize, _: &mut WarningSink<'_>) -> Result<Self> {
        let [hello, unknown1, fight, flee, alarm, unknown2, unknown3, unknown4] =
            cursor.read_array::<8>()?;
        Ok(AiData {
            hello,
            unknown1,
            fight,
            flee,
            alarm,
            unknown2,
            unknown3,
            unknown4,
            flags: cursor.read_u32()?,
        })
    }

    fn encode<W: Write>(&self, writer: &mut ByteWriter<W>, _: &mut WarningSink<'_>) -> Result<()> {
        writer.write_bytes(&[
            self.hello,
            self.unknown1,
            self.fight,
            self.flee,
            self.alarm,
            self.unknown2,
            self.unknown3,
            self.unknown4,
        ])?;
        writer.write_u32(self.flags)
    }
}

/// Inventory, AI and travel data common to NPCs and creatures
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActorData {
    pub items: Vec<InventoryItem>,
    pub spells: Vec<String>,
    pub ai_data: Option<AiData>,
    pub packages: BehaviorPackageGroup,
    pub destinations: Vec<Destination>,
}

impl ActorData {
    /// Tags [`ActorDataDecoder`] consumes
    pub(crate) const TAGS: &'static [Tag] = &[
        tags::NPCO,
        tags::NPCS,
        tags::AIDT,
        tags::AI_W,
        tags::AI_T,
        tags::AI_F,
        tags::AI_E,
        tags::AI_A,
        tags::CNDT,
        tags::DODT,
        tags::DNAM,
    ];

    /// Write items, spells, `AIDT`, packages and destinations, in that order
    pub(crate) fn encode<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        for item in &self.items {
            write_fixed(writer, tags::NPCO, item, warnings)?;
        }
        for spell in &self.spells {
            write_fixed(writer, tags::NPCS, &SpellSlot(spell.clone()), warnings)?;
        }
        if let Some(ai_data) = &self.ai_data {
            write_fixed(writer, tags::AIDT, ai_data, warnings)?;
        }
        self.packages.encode(writer, warnings)?;
        for destination in &self.destinations {
            destination.encode_subrecords(writer, warnings)?;
        }
        Ok(())
    }
}

/// Feeds the shared actor subrecords into an [`ActorData`] while the owning
/// record decodes everything else.
pub(crate) struct ActorDataDecoder {
    items: Vec<InventoryItem>,
    spells: Vec<String>,
    ai_data: Option<AiData>,
    packages: PackageDispatcher,
    destinations: DestinationCollector,
    previous: Option<Tag>,
}

impl ActorDataDecoder {
    pub fn new(record: Tag) -> Self {
        Self {
            items: Vec::new(),
            spells: Vec::new(),
            ai_data: None,
            packages: PackageDispatcher::new(record),
            destinations: DestinationCollector::new(),
            previous: None,
        }
    }

    /// Offer a subrecord. Returns `false` when the tag belongs to the owning
    /// record; it still counts as the previous subrecord for attachments.
    pub fn decode(
        &mut self,
        tag: Tag,
        payload: &[u8],
        dialect: Dialect,
        warnings: &mut Vec<Warning>,
    ) -> Result<bool> {
        if PackageDispatcher::handles(tag) {
            self.packages.dispatch(tag, payload, dialect, warnings)?;
            self.previous = Some(tag);
            return Ok(true);
        }

        self.packages.interrupt(tag);
        let handled = match tag {
            tags::NPCO => {
                self.items.push(read_fixed(payload, tag, warnings)?);
                true
            }
            tags::NPCS => {
                let SpellSlot(spell) = read_fixed(payload, tag, warnings)?;
                self.spells.push(spell);
                true
            }
            tags::AIDT => {
                self.ai_data = Some(read_fixed(payload, tag, warnings)?);
                true
            }
            _ if DestinationCollector::handles(tag) => {
                self.destinations
                    .dispatch(tag, payload, dialect, self.previous, warnings)?;
                true
            }
            _ => false,
        };
        self.previous = Some(tag);
        Ok(handled)
    }

    pub fn finish(self) -> ActorData {
        ActorData {
            items: self.items,
            spells: self.spells,
            ai_data: self.ai_data,
            packages: self.packages.finish(),
            destinations: self.destinations.finish(),
        }
    }
}
