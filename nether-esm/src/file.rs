//! In-memory model of a whole plugin/master file

use serde::Serialize;

use crate::dialect::Dialect;
use crate::record::{GenericRecord, Record, RecordFlags};
use crate::tag::Tag;

/// Size of a modern `GRUP` header
pub const GROUP_HEADER_LEN: usize = 24;

/// The `TES3`/`TES4` record every file starts with, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    pub record: GenericRecord,
}

impl FileHeader {
    pub fn flags(&self) -> RecordFlags {
        self.record.header.flags()
    }

    pub fn is_master(&self) -> bool {
        self.flags().contains(RecordFlags::MASTER)
    }

    /// Whether names are string table indices. Only modern files use this bit.
    pub fn is_localized(&self) -> bool {
        self.record.header.version_info.is_some() && self.flags().contains(RecordFlags::LOCALIZED)
    }
}

/// Modern `GRUP` container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// Record type for top-level groups, a form id or cell coordinates otherwise
    pub label: [u8; 4],
    pub group_type: i32,
    pub stamp: u32,
    pub unknown: u32,
    pub entries: Vec<Entry>,
}

impl Group {
    /// Top-level group holding records of `tag`
    pub fn top(tag: Tag) -> Self {
        Self {
            label: *tag.as_bytes(),
            group_type: 0,
            stamp: 0,
            unknown: 0,
            entries: Vec::new(),
        }
    }

    pub fn label_tag(&self) -> Tag {
        Tag(self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entry", rename_all = "lowercase")]
pub enum Entry {
    Record(Record),
    Group(Group),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EsmFile {
    pub dialect: Dialect,
    /// Effective localization flag the records were decoded with
    pub localized: bool,
    pub header: FileHeader,
    pub entries: Vec<Entry>,
}

impl EsmFile {
    pub fn new(dialect: Dialect, header: FileHeader) -> Self {
        Self {
            dialect,
            localized: header.is_localized(),
            header,
            entries: Vec::new(),
        }
    }

    /// Every record in file order, descending into groups
    pub fn records(&self) -> Vec<&Record> {
        fn collect<'a>(entries: &'a [Entry], out: &mut Vec<&'a Record>) {
            for entry in entries {
                match entry {
                    Entry::Record(record) => out.push(record),
                    Entry::Group(group) => collect(&group.entries, out),
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.entries, &mut out);
        out
    }

    /// First record with editor id `id`
    pub fn find(&self, id: &str) -> Option<&Record> {
        self.records().into_iter().find(|r| r.id() == Some(id))
    }
}
