//! File-level reader: header record, groups and records

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::config::{ReaderConfig, RecordErrorPolicy};
use crate::cursor::ByteCursor;
use crate::dialect::Dialect;
use crate::error::{EsmError, Result};
use crate::file::{Entry, EsmFile, FileHeader, GROUP_HEADER_LEN, Group};
use crate::fixed::FixedLen;
use crate::localized::{NoStrings, Session, StringTable};
use crate::record::{GenericRecord, Record, RecordHeader, decode_record};
use crate::tag::{Tag, tags};

/// Counters collected while reading one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReadStats {
    /// Records encountered, header record excluded
    pub records_total: usize,
    pub records_by_tag: BTreeMap<String, usize>,
    /// Records that failed to decode under [`RecordErrorPolicy::Skip`]
    pub records_skipped: usize,
    /// Unknown records left out because `keep_unknown_records` is off
    pub records_dropped: usize,
    pub groups: usize,
    /// Non-fatal warnings, prefixed with the record they came from
    pub warnings: Vec<String>,
}

impl ReadStats {
    fn count(&mut self, tag: Tag) {
        self.records_total += 1;
        *self.records_by_tag.entry(tag.to_string()).or_default() += 1;
    }
}

static NO_STRINGS: NoStrings = NoStrings;

/// Reads whole files into an [`EsmFile`]
pub struct EsmReader<'t> {
    config: ReaderConfig,
    strings: &'t dyn StringTable,
}

impl EsmReader<'static> {
    /// Reader without a string table; localized files fail on the first name
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            strings: &NO_STRINGS,
        }
    }
}

impl<'t> EsmReader<'t> {
    pub fn with_strings(config: ReaderConfig, strings: &'t dyn StringTable) -> Self {
        Self { config, strings }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn read_file(&self, path: &Path) -> Result<(EsmFile, ReadStats)> {
        let data = std::fs::read(path)?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "reading file");
        self.read_bytes(&data)
    }

    pub fn read_bytes(&self, data: &[u8]) -> Result<(EsmFile, ReadStats)> {
        let first = ByteCursor::new(data).read_tag()?;
        let dialect = match self.config.dialect {
            Some(dialect) => dialect,
            None => Dialect::sniff(first).ok_or(EsmError::InvalidFileHeader(first))?,
        };
        if first != dialect.file_header_tag() {
            return Err(EsmError::InvalidFileHeader(first));
        }

        let (header, body_start) =
            read_record_header(data, 0, data.len(), dialect).map_err(|e| e.in_record(first, 0))?;
        let body = &data[body_start..body_start + header.size as usize];
        let unlocalized = Session::unlocalized(dialect);
        let header_record: GenericRecord =
            decode_record(header, body, &unlocalized, &mut Vec::new())
                .map_err(|e| e.in_record(first, 0))?;

        let mut file = EsmFile::new(
            dialect,
            FileHeader {
                record: header_record,
            },
        );
        if let Some(localized) = self.config.localized {
            file.localized = localized;
        }
        tracing::debug!(?dialect, localized = file.localized, "file header");

        let mut walker = Walker {
            data,
            config: &self.config,
            session: Session::new(dialect, file.localized, self.strings),
            stats: ReadStats::default(),
        };
        let end = body_start + body.len();
        file.entries = walker.read_entries(end, data.len())?;
        Ok((file, walker.stats))
    }
}

/// Read the record header at `offset`, checking that the body fits before `limit`.
/// Returns the header and the offset of its body.
fn read_record_header(
    data: &[u8],
    offset: usize,
    limit: usize,
    dialect: Dialect,
) -> Result<(RecordHeader, usize)> {
    let mut cursor = ByteCursor::new(&data[offset..limit]);
    let header = RecordHeader::read(&mut cursor, dialect)?;
    let body_start = offset + cursor.position();
    let size = header.size as usize;
    let available = data.len() - body_start;
    if size > available {
        return Err(EsmError::Truncated {
            needed: size,
            available,
        });
    }
    // Fits in the file but crosses the end of the enclosing group
    if size > limit - body_start {
        return Err(EsmError::Overrun {
            requested: size,
            remaining: limit - body_start,
        });
    }
    Ok((header, body_start))
}

struct GroupHeader {
    size: usize,
    label: [u8; 4],
    group_type: i32,
    stamp: u32,
    unknown: u32,
}

fn read_group_header(data: &[u8], offset: usize, limit: usize) -> Result<GroupHeader> {
    let mut cursor = ByteCursor::new(&data[offset..limit]);
    cursor.read_tag()?;
    let header = GroupHeader {
        size: cursor.read_u32()? as usize,
        label: cursor.read_array::<4>()?,
        group_type: cursor.read_i32()?,
        stamp: cursor.read_u32()?,
        unknown: cursor.read_u32()?,
    };
    if header.size < GROUP_HEADER_LEN {
        return Err(EsmError::LengthMismatch {
            tag: tags::GRUP,
            expected: FixedLen::Exact(GROUP_HEADER_LEN),
            found: header.size,
        });
    }
    if header.size > limit - offset {
        return Err(EsmError::Overrun {
            requested: header.size,
            remaining: limit - offset,
        });
    }
    Ok(header)
}

struct Walker<'a, 'c, 't> {
    data: &'a [u8],
    config: &'c ReaderConfig,
    session: Session<'t>,
    stats: ReadStats,
}

impl Walker<'_, '_, '_> {
    /// Read records and groups in `data[pos..end]`
    fn read_entries(&mut self, mut pos: usize, end: usize) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        while pos < end {
            let tag = ByteCursor::new(&self.data[pos..end]).read_tag()?;

            if tag == tags::GRUP && self.session.dialect == Dialect::Modern {
                let (group, next) = self.read_group(pos, end)?;
                entries.push(Entry::Group(group));
                pos = next;
                continue;
            }

            let (header, body_start) = read_record_header(self.data, pos, end, self.session.dialect)
                .map_err(|e| e.in_record(tag, pos))?;
            let next = body_start + header.size as usize;
            self.stats.count(tag);

            if !self.config.keep_unknown_records && !Record::is_typed(tag, self.session.dialect) {
                tracing::trace!(%tag, offset = pos, "dropping unknown record");
                self.stats.records_dropped += 1;
                pos = next;
                continue;
            }

            let mut warnings = Vec::new();
            match Record::decode(header, &self.data[body_start..next], &self.session, &mut warnings)
            {
                Ok(record) => {
                    let context = match record.id() {
                        Some(id) => format!("{} {}", tag, id),
                        None => tag.to_string(),
                    };
                    self.stats.warnings.extend(
                        warnings.iter().map(|w| format!("{}: {}", context, w)),
                    );
                    entries.push(Entry::Record(record));
                }
                Err(e) => {
                    let err = e.in_record(tag, pos);
                    match self.config.on_record_error {
                        RecordErrorPolicy::Abort => return Err(err),
                        RecordErrorPolicy::Skip => {
                            tracing::warn!("skipping {}", err);
                            self.stats.records_skipped += 1;
                        }
                    }
                }
            }
            pos = next;
        }
        Ok(entries)
    }

    /// Read the group at `pos`. Returns it and the offset just past it.
    fn read_group(&mut self, pos: usize, end: usize) -> Result<(Group, usize)> {
        let header =
            read_group_header(self.data, pos, end).map_err(|e| e.in_record(tags::GRUP, pos))?;
        self.stats.groups += 1;
        tracing::debug!(
            label = %Tag(header.label),
            group_type = header.group_type,
            size = header.size,
            offset = pos,
            "group"
        );

        let next = pos + header.size;
        let entries = self.read_entries(pos + GROUP_HEADER_LEN, next)?;
        let group = Group {
            label: header.label,
            group_type: header.group_type,
            stamp: header.stamp,
            unknown: header.unknown,
            entries,
        };
        Ok((group, next))
    }
}
