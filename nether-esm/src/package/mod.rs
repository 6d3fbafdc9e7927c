//! Actor behavior packages
//!
//! Actor records carry an ordered list of AI packages, one subrecord each:
//!
//! | Tag    | Variant  | Payload |
//! |--------|----------|---------|
//! | `AI_W` | Wander   | 14 bytes |
//! | `AI_T` | Travel   | 16 bytes |
//! | `AI_F` | Follow   | 48 bytes, optional trailing `CNDT` cell name |
//! | `AI_E` | Escort   | 48 bytes, optional trailing `CNDT` cell name |
//! | `AI_A` | Activate | 33 bytes |
//!
//! File order is execution priority and is never changed.

mod dispatcher;

pub use dispatcher::{DispatchState, PackageDispatcher};

use std::io::Write;

use serde::Serialize;

use crate::cursor::{ByteCursor, ByteWriter};
use crate::error::{Result, Warning, WarningSink};
use crate::fixed::{FixedBlock, FixedLen, write_fixed};
use crate::string::{NAME_SLOT_LEN, decode_name_slot, write_name_slot, write_string};
use crate::tag::{Tag, tags};

/// Float comparison where NaN equals NaN, so decoded packages compare equal
/// to themselves.
fn same_float(a: f32, b: f32) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Wander around the current position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Wander {
    pub distance: u16,
    pub duration: u16,
    pub time_of_day: u8,
    /// Chances (0-100) of the eight idle animations
    pub idles: [u8; 8],
    pub reset: u8,
}

impl FixedBlock for Wander {
    const LEN: FixedLen = FixedLen::Exact(14);

    fn decode(cursor: &mut ByteCursor<'_>, _len: usize, _: &mut WarningSink<'_>) -> Result<Self> {
        Ok(Wander {
            distance: cursor.read_u16()?,
            duration: cursor.read_u16()?,
            time_of_day: cursor.read_u8()?,
            idles: cursor.read_array()?,
            reset: cursor.read_u8()?,
        })
    }

    fn encode<W: Write>(&self, writer: &mut ByteWriter<W>, _: &mut WarningSink<'_>) -> Result<()> {
        writer.write_u16(self.distance)?;
        writer.write_u16(self.duration)?;
        writer.write_u8(self.time_of_day)?;
        writer.write_bytes(&self.idles)?;
        writer.write_u8(self.reset)
    }
}

/// Travel to a position
#[derive(Debug, Clone, Default, Serialize)]
pub struct Travel {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub reset: u32,
}

impl PartialEq for Travel {
    fn eq(&self, other: &Self) -> bool {
        same_float(self.x, other.x)
            && same_float(self.y, other.y)
            && same_float(self.z, other.z)
            && self.reset == other.reset
    }
}

impl FixedBlock for Travel {
    const LEN: FixedLen = FixedLen::Exact(16);

    fn decode(cursor: &mut ByteCursor<'_>, _len: usize, _: &mut WarningSink<'_>) -> Result<Self> {
        Ok(Travel {
            x: cursor.read_f32()?,
            y: cursor.read_f32()?,
            z: cursor.read_f32()?,
            reset: cursor.read_u32()?,
        })
    }

    fn encode<W: Write>(&self, writer: &mut ByteWriter<W>, _: &mut WarningSink<'_>) -> Result<()> {
        writer.write_f32(self.x)?;
        writer.write_f32(self.y)?;
        writer.write_f32(self.z)?;
        writer.write_u32(self.reset)
    }
}

/// Payload shared by follow and escort packages
#[derive(Debug, Clone, Default, Serialize)]
pub struct FollowEscort {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub duration: u16,
    pub target: String,
    pub reset: u16,
    /// Cell the package is restricted to, from a trailing `CNDT` subrecord
    pub cell_name: Option<String>,
}

impl PartialEq for FollowEscort {
    fn eq(&self, other: &Self) -> bool {
        same_float(self.x, other.x)
            && same_float(self.y, other.y)
            && same_float(self.z, other.z)
            && self.duration == other.duration
            && self.target == other.target
            && self.reset == other.reset
            && self.cell_name == other.cell_name
    }
}

impl FixedBlock for FollowEscort {
    const LEN: FixedLen = FixedLen::Exact(48);

    fn decode(
        cursor: &mut ByteCursor<'_>,
        _len: usize,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Self> {
        let x = cursor.read_f32()?;
        let y = cursor.read_f32()?;
        let z = cursor.read_f32()?;
        let duration = cursor.read_u16()?;
        let target = decode_name_slot(cursor.read_exact(NAME_SLOT_LEN)?, warnings);
        let reset = cursor.read_u16()?;
        Ok(FollowEscort {
            x,
            y,
            z,
            duration,
            target,
            reset,
            cell_name: None,
        })
    }

    fn encode<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        warnings: &mut WarningSink<'_>,
    ) -> Result<()> {
        writer.write_f32(self.x)?;
        writer.write_f32(self.y)?;
        writer.write_f32(self.z)?;
        writer.write_u16(self.duration)?;
        write_name_slot(writer, &self.target, NAME_SLOT_LEN, warnings)?;
        writer.write_u16(self.reset)
    }
}

/// Activate an object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Activate {
    pub target: String,
    pub reset: u8,
}

impl FixedBlock for Activate {
    const LEN: FixedLen = FixedLen::Exact(33);

    fn decode(
        cursor: &mut ByteCursor<'_>,
        _len: usize,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Self> {
        let target = decode_name_slot(cursor.read_exact(NAME_SLOT_LEN)?, warnings);
        Ok(Activate {
            target,
            reset: cursor.read_u8()?,
        })
    }

    fn encode<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        warnings: &mut WarningSink<'_>,
    ) -> Result<()> {
        write_name_slot(writer, &self.target, NAME_SLOT_LEN, warnings)?;
        writer.write_u8(self.reset)
    }
}

/// One AI package
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BehaviorPackage {
    Wander(Wander),
    Travel(Travel),
    Follow(FollowEscort),
    Escort(FollowEscort),
    Activate(Activate),
}

impl BehaviorPackage {
    /// Subrecord tag this package is stored under
    pub fn tag(&self) -> Tag {
        match self {
            BehaviorPackage::Wander(_) => tags::AI_W,
            BehaviorPackage::Travel(_) => tags::AI_T,
            BehaviorPackage::Follow(_) => tags::AI_F,
            BehaviorPackage::Escort(_) => tags::AI_E,
            BehaviorPackage::Activate(_) => tags::AI_A,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BehaviorPackage::Wander(_) => "wander",
            BehaviorPackage::Travel(_) => "travel",
            BehaviorPackage::Follow(_) => "follow",
            BehaviorPackage::Escort(_) => "escort",
            BehaviorPackage::Activate(_) => "activate",
        }
    }

    /// Cell-name slot, for the variants that take a `CNDT` attachment
    pub fn cell_name_slot(&mut self) -> Option<&mut Option<String>> {
        match self {
            BehaviorPackage::Follow(p) | BehaviorPackage::Escort(p) => Some(&mut p.cell_name),
            _ => None,
        }
    }

    pub fn cell_name(&self) -> Option<&str> {
        match self {
            BehaviorPackage::Follow(p) | BehaviorPackage::Escort(p) => p.cell_name.as_deref(),
            _ => None,
        }
    }

    /// Write the package subrecord, followed by its `CNDT` if one is set
    pub fn encode<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        let tag = self.tag();
        match self {
            BehaviorPackage::Wander(p) => write_fixed(writer, tag, p, warnings),
            BehaviorPackage::Travel(p) => write_fixed(writer, tag, p, warnings),
            BehaviorPackage::Activate(p) => write_fixed(writer, tag, p, warnings),
            BehaviorPackage::Follow(p) | BehaviorPackage::Escort(p) => {
                write_fixed(writer, tag, p, warnings)?;
                if let Some(cell) = &p.cell_name {
                    write_string(
                        writer,
                        tags::CNDT,
                        cell,
                        &mut WarningSink::new(tags::CNDT, warnings),
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// Packages of one actor in file order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BehaviorPackageGroup {
    packages: Vec<BehaviorPackage>,
}

impl BehaviorPackageGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a package, returning its index
    pub fn push(&mut self, package: BehaviorPackage) -> usize {
        self.packages.push(package);
        self.packages.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&BehaviorPackage> {
        self.packages.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut BehaviorPackage> {
        self.packages.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BehaviorPackage> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn as_slice(&self) -> &[BehaviorPackage] {
        &self.packages
    }

    pub fn encode<W: Write>(
        &self,
        writer: &mut ByteWriter<W>,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        for package in &self.packages {
            package.encode(writer, warnings)?;
        }
        Ok(())
    }
}

impl From<Vec<BehaviorPackage>> for BehaviorPackageGroup {
    fn from(packages: Vec<BehaviorPackage>) -> Self {
        Self { packages }
    }
}

impl<'a> IntoIterator for &'a BehaviorPackageGroup {
    type Item = &'a BehaviorPackage;
    type IntoIter = std::slice::Iter<'a, BehaviorPackage>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.iter()
    }
}
