//! Nether-ESM: record/subrecord codec for legacy and modern ESM/ESP game-data files
//!
//! A file is a sequence of records. Each record has a four-byte tag, a
//! declared body size and two header words; its body is an ordered list of
//! subrecords, each with its own tag, length and payload. Two dialects exist:
//!
//! | | Legacy | Modern |
//! |---|---|---|
//! | Subrecord length | `u32` | `u16` (`XXXX` for larger payloads) |
//! | Record header | 16 bytes | 24 bytes |
//! | Inline string max | 255 bytes | 511 bytes |
//! | Groups | no | `GRUP` |
//! | Localized strings | no | string table indices |
//!
//! # Key Features
//!
//! - **Typed records**: `NPC_` and `CREA` (legacy), `MISC` (modern); every
//!   other record type round-trips verbatim as a [`GenericRecord`]
//! - **Behavior packages**: the polymorphic `AI_*` group with `CNDT` cell
//!   name attachments, decoded in file order
//! - **Strict sizes**: every declared size is consumed exactly
//! - **String tables**: `.strings`, `.dlstrings` and `.ilstrings` files
//!
//! # Usage
//!
//! ```ignore
//! use nether_esm::{EsmReader, ReaderConfig};
//!
//! let reader = EsmReader::new(ReaderConfig::default());
//! let (file, stats) = reader.read_file("Morrowind.esm".as_ref())?;
//!
//! for record in file.records() {
//!     if let Some(packages) = record.packages() {
//!         for package in packages {
//!             println!("{:?} {} {:?}", record.id(), package.kind(), package.cell_name());
//!         }
//!     }
//! }
//! println!("{} records, {} skipped", stats.records_total, stats.records_skipped);
//! ```

mod config;
mod cursor;
mod destination;
mod dialect;
mod error;
mod file;
mod fixed;
mod localized;
mod package;
mod presence;
mod reader;
pub mod record;
mod string;
mod string_table;
mod tag;
mod writer;

pub use config::{ReaderConfig, RecordErrorPolicy};
pub use cursor::{ByteCursor, ByteWriter, subrecord_size};
pub use destination::{Destination, DestinationCollector};
pub use dialect::Dialect;
pub use error::{EsmError, Result, Warning, WarningKind, WarningSink};
pub use file::{Entry, EsmFile, FileHeader, GROUP_HEADER_LEN, Group};
pub use fixed::{FixedBlock, FixedLen, read_fixed, write_fixed};
pub use localized::{NoStrings, Session, StringTable, StringValue, read_localized, write_localized};
pub use package::{
    Activate, BehaviorPackage, BehaviorPackageGroup, DispatchState, FollowEscort,
    PackageDispatcher, Travel, Wander,
};
pub use presence::{PresenceTracker, TagPolicy, TagSchema};
pub use reader::{EsmReader, ReadStats};
pub use record::{
    CreatureRecord, GenericRecord, MiscRecord, NpcRecord, RawSubrecord, Record, RecordCodec,
    RecordFlags, RecordHeader, SubrecordHeader, SubrecordReader, decode_record, encode_record,
};
pub use string::{NAME_SLOT_LEN, decode_name_slot, decode_string, write_name_slot, write_string};
pub use string_table::{StringTableKind, StringTableMap};
pub use tag::{Tag, tags};
pub use writer::{EsmWriter, to_bytes, write_file};
