//! Inline-or-indexed string subrecords
//!
//! In a localized modern file, name subrecords such as `FULL` hold a 4-byte
//! index into an external string table instead of the text itself. Whether
//! a file is localized is a file-level flag carried by the [`Session`].

use std::fmt;
use std::io::Write;

use serde::Serialize;

use crate::cursor::{ByteCursor, ByteWriter};
use crate::dialect::Dialect;
use crate::error::{EsmError, Result, WarningSink};
use crate::fixed::FixedLen;
use crate::string::{decode_string, write_string};
use crate::tag::Tag;

/// Read-only index to string lookup, supplied once per file session
pub trait StringTable {
    fn get_string(&self, index: u32) -> Option<&str>;

    fn has_string(&self, index: u32) -> bool {
        self.get_string(index).is_some()
    }
}

/// Table with no entries, for unlocalized sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStrings;

impl StringTable for NoStrings {
    fn get_string(&self, _index: u32) -> Option<&str> {
        None
    }
}

/// Value of a string subrecord that may be localized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StringValue {
    Inline { text: String },
    /// Table index with the text it resolved to. Index 0 is the empty-string
    /// sentinel and is never looked up.
    Indexed { index: u32, text: String },
}

impl StringValue {
    pub fn inline(text: impl Into<String>) -> Self {
        StringValue::Inline { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            StringValue::Inline { text } | StringValue::Indexed { text, .. } => text,
        }
    }

    pub fn index(&self) -> Option<u32> {
        match self {
            StringValue::Inline { .. } => None,
            StringValue::Indexed { index, .. } => Some(*index),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            StringValue::Inline { .. } => "inline",
            StringValue::Indexed { .. } => "indexed",
        }
    }
}

/// Per-file decoding context shared by every record of the file
#[derive(Clone, Copy)]
pub struct Session<'t> {
    pub dialect: Dialect,
    pub localized: bool,
    pub strings: &'t dyn StringTable,
}

impl<'t> Session<'t> {
    pub fn new(dialect: Dialect, localized: bool, strings: &'t dyn StringTable) -> Self {
        Self {
            dialect,
            localized,
            strings,
        }
    }
}

impl Session<'static> {
    /// Session without a string table
    pub fn unlocalized(dialect: Dialect) -> Self {
        Self {
            dialect,
            localized: false,
            strings: &NoStrings,
        }
    }
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("dialect", &self.dialect)
            .field("localized", &self.localized)
            .finish_non_exhaustive()
    }
}

/// Decode a possibly-localized string payload
pub fn read_localized(payload: &[u8], tag: Tag, session: &Session<'_>) -> Result<StringValue> {
    if !session.localized {
        return Ok(StringValue::Inline {
            text: decode_string(payload, tag, session.dialect)?,
        });
    }

    if payload.len() != 4 {
        return Err(EsmError::LengthMismatch {
            tag,
            expected: FixedLen::Exact(4),
            found: payload.len(),
        });
    }
    let index = ByteCursor::new(payload).read_u32()?;
    if index == 0 {
        return Ok(StringValue::Indexed {
            index,
            text: String::new(),
        });
    }
    match session.strings.get_string(index) {
        Some(text) => Ok(StringValue::Indexed {
            index,
            text: text.to_string(),
        }),
        None => Err(EsmError::StringTableMiss { tag, index }),
    }
}

/// Write a possibly-localized string subrecord, header included.
///
/// The value's kind must agree with the session: a localized session writes
/// indices only, an unlocalized one inline text only.
pub fn write_localized<W: Write>(
    writer: &mut ByteWriter<W>,
    tag: Tag,
    value: &StringValue,
    session: &Session<'_>,
    warnings: &mut WarningSink<'_>,
) -> Result<()> {
    match (value, session.localized) {
        (StringValue::Inline { text }, false) => write_string(writer, tag, text, warnings),
        (StringValue::Indexed { index, .. }, true) => {
            writer.write_subrecord_header(tag, 4)?;
            writer.write_u32(*index)
        }
        (value, localized) => Err(EsmError::LocalizationMismatch {
            tag,
            found: value.kind(),
            expected: if localized { "localized" } else { "unlocalized" },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string_table::StringTableMap;
    use crate::tag::tags;

    struct Counting {
        inner: StringTableMap,
        lookups: std::cell::Cell<usize>,
    }

    impl StringTable for Counting {
        fn get_string(&self, index: u32) -> Option<&str> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.get_string(index)
        }
    }

    #[test]
    fn test_unlocalized_reads_inline() {
        let session = Session::unlocalized(Dialect::Modern);
        let value = read_localized(b"Gold\0", tags::FULL, &session).unwrap();
        assert_eq!(value, StringValue::inline("Gold"));
    }

    #[test]
    fn test_index_zero_is_empty_without_lookup() {
        let table = Counting {
            inner: StringTableMap::new(),
            lookups: std::cell::Cell::new(0),
        };
        let session = Session::new(Dialect::Modern, true, &table);
        let value = read_localized(&0u32.to_le_bytes(), tags::FULL, &session).unwrap();
        assert_eq!(value.text(), "");
        assert_eq!(value.index(), Some(0));
        assert_eq!(table.lookups.get(), 0);
    }

    #[test]
    fn test_missing_index_is_fatal() {
        let session = Session::new(Dialect::Modern, true, &NoStrings);
        let err = read_localized(&7u32.to_le_bytes(), tags::FULL, &session).unwrap_err();
        assert!(matches!(err, EsmError::StringTableMiss { index: 7, .. }));
    }

    #[test]
    fn test_present_index_resolves() {
        let mut table = StringTableMap::new();
        table.add_string(7, "Septim");
        let session = Session::new(Dialect::Modern, true, &table);
        let value = read_localized(&7u32.to_le_bytes(), tags::FULL, &session).unwrap();
        assert_eq!(
            value,
            StringValue::Indexed {
                index: 7,
                text: "Septim".to_string()
            }
        );
    }

    #[test]
    fn test_localized_payload_must_be_four_bytes() {
        let session = Session::new(Dialect::Modern, true, &NoStrings);
        let err = read_localized(b"Gold\0", tags::FULL, &session).unwrap_err();
        assert!(matches!(err, EsmError::LengthMismatch { found: 5, .. }));
    }

    #[test]
    fn test_write_rejects_kind_mismatch() {
        let mut warnings = Vec::new();
        let mut writer = ByteWriter::new(Vec::new(), Dialect::Modern);
        let session = Session::new(Dialect::Modern, true, &NoStrings);
        let err = write_localized(
            &mut writer,
            tags::FULL,
            &StringValue::inline("Gold"),
            &session,
            &mut WarningSink::new(tags::FULL, &mut warnings),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EsmError::LocalizationMismatch {
                found: "inline",
                ..
            }
        ));
    }

    #[test]
    fn test_write_index() {
        let mut warnings = Vec::new();
        let mut writer = ByteWriter::new(Vec::new(), Dialect::Modern);
        let session = Session::new(Dialect::Modern, true, &NoStrings);
        write_localized(
            &mut writer,
            tags::FULL,
            &StringValue::Indexed {
                index: 0,
                text: String::new(),
            },
            &session,
            &mut WarningSink::new(tags::FULL, &mut warnings),
        )
        .unwrap();
        assert_eq!(writer.into_inner(), b"FULL\x04\0\0\0\0\0");
    }
}
