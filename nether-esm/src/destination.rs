//! Travel destinations of actors offering transport
//!
//! Each destination is a `DODT` subrecord (position and rotation), optionally
//! followed by a `DNAM` naming the interior cell. A `DODT` without a name is
//! complete as soon as the next `DODT` starts or the record ends.

use std::io::Write;

use serde::Serialize;

use crate::cursor::{ByteCursor, ByteWriter};
use crate::dialect::Dialect;
use crate::error::{EsmError, Result, Warning, WarningSink};
use crate::fixed::{FixedBlock, FixedLen, read_fixed, write_fixed};
use crate::string::{decode_string, write_string};
use crate::tag::{Tag, tags};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Destination {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    /// Interior cell name; exterior destinations have none
    pub cell_name: Option<String>,
}

impl PartialEq for Destination {
    fn eq(&self, other: &Self) -> bool {
        let floats = self.position.iter().chain(&self.rotation);
        let other_floats = other.position.iter().chain(&other.rotation);
        floats
            .zip(other_floats)
            .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
            && self.cell_name == other.cell_name
    }
}

impl FixedBlock for Destination {
    const LEN: FixedLen = FixedLen::Exact(24);

    fn decode(cursor: &mut ByteCursor<'_>, _len: usize, _: &mut WarningSink<'_>) -> Result<Self> {
        let mut position = [0.0; 3];
        for value in &mut position {
            *value = cursor.read_f32()?;
        }
        let mut rotation = [0.0; 3];
        for value in &mut rotation {
            *value = cursor.read_f32()?;
        }
        Ok(Destination {
            position,
            rotation,
            cell_name: None,
        })
    }

    fn encode<W: Write>(&self, writer: &mut ByteWriter<W>, _: &mut WarningSink<'_>) -> Result<()> {
        for &value in self.position.iter().chain(&self.rotation) {
            writer.write_f32(value)?;
        }
        Ok(())
    }
}

impl Destination {
    /// Write `DODT` and, for interiors, `DNAM`
    pub fn encode_subrecords<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        write_fixed(writer, tags::DODT, self, warnings)?;
        if let Some(cell) = &self.cell_name {
            write_string(
                writer,
                tags::DNAM,
                cell,
                &mut WarningSink::new(tags::DNAM, warnings),
            )?;
        }
        Ok(())
    }
}

/// Accumulates destinations while an actor record is decoded
#[derive(Debug, Default)]
pub struct DestinationCollector {
    destinations: Vec<Destination>,
    pending: Option<Destination>,
}

impl DestinationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handles(tag: Tag) -> bool {
        matches!(tag, tags::DODT | tags::DNAM)
    }

    /// Decode a `DODT` or `DNAM`. `previous` is the subrecord read before it,
    /// for error reporting.
    pub fn dispatch(
        &mut self,
        tag: Tag,
        payload: &[u8],
        dialect: Dialect,
        previous: Option<Tag>,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        match tag {
            tags::DODT => {
                let destination = read_fixed(payload, tag, warnings)?;
                self.destinations.extend(self.pending.replace(destination));
                Ok(())
            }
            tags::DNAM => {
                let Some(mut destination) = self.pending.take() else {
                    return Err(EsmError::MisplacedAttachment { tag, previous });
                };
                destination.cell_name = Some(decode_string(payload, tag, dialect)?);
                self.destinations.push(destination);
                Ok(())
            }
            _ => Err(EsmError::MisplacedAttachment { tag, previous }),
        }
    }

    /// Finish the record, keeping a trailing unnamed `DODT`
    pub fn finish(mut self) -> Vec<Destination> {
        self.destinations.extend(self.pending.take());
        self.destinations
    }
}
