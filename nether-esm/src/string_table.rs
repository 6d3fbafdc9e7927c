//! String table files
//!
//! Localized plugins keep their display strings in three companion files
//! (`.strings`, `.dlstrings`, `.ilstrings`). All three share one layout:
//!
//! ```text
//! count: u32, data_size: u32
//! count x { id: u32, offset: u32 }     offsets relative to the data block
//! data_size bytes of string data
//! ```
//!
//! Plain tables store NUL-terminated strings; the other two prefix each
//! string with a `u32` length that includes the terminator.

use std::path::Path;

use hashbrown::HashMap;

use crate::cursor::ByteCursor;
use crate::error::{EsmError, Result};
use crate::localized::StringTable;
use crate::string::{bytes_to_string, string_to_bytes};

/// Entry encoding of a string table file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringTableKind {
    /// `.strings`: NUL-terminated entries
    Plain,
    /// `.dlstrings`: length-prefixed entries
    DlStrings,
    /// `.ilstrings`: length-prefixed entries
    IlStrings,
}

impl StringTableKind {
    /// Guess the kind from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "strings" => Some(StringTableKind::Plain),
            "dlstrings" => Some(StringTableKind::DlStrings),
            "ilstrings" => Some(StringTableKind::IlStrings),
            _ => None,
        }
    }

    fn length_prefixed(self) -> bool {
        !matches!(self, StringTableKind::Plain)
    }
}

/// In-memory string table
#[derive(Debug, Clone, Default)]
pub struct StringTableMap {
    entries: HashMap<u32, String>,
}

impl StringTableMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry. Index 0 is the empty-string sentinel and is
    /// never stored.
    pub fn add_string(&mut self, index: u32, text: impl Into<String>) {
        if index == 0 {
            return;
        }
        self.entries.insert(index, text.into());
    }

    pub fn remove_string(&mut self, index: u32) -> Option<String> {
        self.entries.remove(&index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries sorted by index
    pub fn sorted(&self) -> Vec<(u32, &str)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(&id, text)| (id, text.as_str()))
            .collect();
        entries.sort_unstable_by_key(|&(id, _)| id);
        entries
    }

    /// Parse a string table file image
    pub fn parse(data: &[u8], kind: StringTableKind) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        let count = cursor.read_u32()? as usize;
        let data_size = cursor.read_u32()? as usize;

        let directory_len = count
            .checked_mul(8)
            .ok_or_else(|| EsmError::InvalidStringTable(format!("{} entries", count)))?;
        let mut directory = cursor.sub_cursor(directory_len)?;
        let block = cursor.read_exact(data_size).map_err(|_| {
            EsmError::InvalidStringTable(format!(
                "data block of {} bytes exceeds file ({} bytes left)",
                data_size,
                cursor.bytes_remaining()
            ))
        })?;

        let mut table = StringTableMap::new();
        for _ in 0..count {
            let id = directory.read_u32()?;
            let offset = directory.read_u32()? as usize;
            if offset >= block.len() {
                return Err(EsmError::InvalidStringTable(format!(
                    "entry {} points at offset {} past the data block",
                    id, offset
                )));
            }
            let text = read_entry(&block[offset..], kind, id)?;
            table.add_string(id, text);
        }

        tracing::debug!(entries = table.len(), ?kind, "parsed string table");
        Ok(table)
    }

    /// Read and parse a string table file, guessing its kind from the extension
    pub fn load(path: &Path) -> Result<Self> {
        let kind = StringTableKind::from_path(path).ok_or_else(|| {
            EsmError::InvalidStringTable(format!(
                "cannot tell table kind from file name {}",
                path.display()
            ))
        })?;
        let data = std::fs::read(path)?;
        Self::parse(&data, kind)
    }

    /// Serialize to the on-disk layout, entries in index order
    pub fn to_bytes(&self, kind: StringTableKind) -> Vec<u8> {
        let entries = self.sorted();
        let mut directory = Vec::with_capacity(entries.len() * 8);
        let mut block = Vec::new();

        for (id, text) in &entries {
            let bytes = string_to_bytes(text);
            directory.extend_from_slice(&id.to_le_bytes());
            directory.extend_from_slice(&(block.len() as u32).to_le_bytes());
            if kind.length_prefixed() {
                block.extend_from_slice(&(bytes.len() as u32 + 1).to_le_bytes());
            }
            block.extend_from_slice(&bytes);
            block.push(0);
        }

        let mut out = Vec::with_capacity(8 + directory.len() + block.len());
        out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        out.extend_from_slice(&(block.len() as u32).to_le_bytes());
        out.extend_from_slice(&directory);
        out.extend_from_slice(&block);
        out
    }
}

fn read_entry(data: &[u8], kind: StringTableKind, id: u32) -> Result<String> {
    let bytes = if kind.length_prefixed() {
        let mut cursor = ByteCursor::new(data);
        let len = cursor.read_u32()? as usize;
        cursor.read_exact(len).map_err(|_| {
            EsmError::InvalidStringTable(format!("entry {} length {} overruns data", id, len))
        })?
    } else {
        data
    };
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(bytes_to_string(&bytes[..end]))
}

impl StringTable for StringTableMap {
    fn get_string(&self, index: u32) -> Option<&str> {
        self.entries.get(&index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StringTableMap {
        let mut table = StringTableMap::new();
        table.add_string(7, "Septim");
        table.add_string(2, "Iron Dagger");
        table
    }

    #[test]
    fn test_index_zero_is_never_stored() {
        let mut table = sample();
        table.add_string(0, "ignored");
        assert_eq!(table.len(), 2);
        assert!(!table.has_string(0));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut table = sample();
        assert_eq!(table.remove_string(2).as_deref(), Some("Iron Dagger"));
        assert_eq!(table.remove_string(2), None);
        table.clear();
        assert!(table.is_empty());
    }

    #[test]
    fn test_plain_layout() {
        let bytes = sample().to_bytes(StringTableKind::Plain);
        // count, size, two directory entries, "Iron Dagger\0Septim\0"
        assert_eq!(&bytes[0..4], &2u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &19u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &0u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &7u32.to_le_bytes());
        assert_eq!(&bytes[20..24], &12u32.to_le_bytes());
        assert_eq!(&bytes[24..], b"Iron Dagger\0Septim\0");
    }

    #[test]
    fn test_parse_each_kind() {
        for kind in [
            StringTableKind::Plain,
            StringTableKind::DlStrings,
            StringTableKind::IlStrings,
        ] {
            let parsed = StringTableMap::parse(&sample().to_bytes(kind), kind).unwrap();
            assert_eq!(parsed.get_string(7), Some("Septim"));
            assert_eq!(parsed.get_string(2), Some("Iron Dagger"));
            assert_eq!(parsed.len(), 2);
        }
    }

    #[test]
    fn test_parse_rejects_bad_offset() {
        let mut bytes = sample().to_bytes(StringTableKind::Plain);
        bytes[20..24].copy_from_slice(&500u32.to_le_bytes());
        assert!(matches!(
            StringTableMap::parse(&bytes, StringTableKind::Plain),
            Err(EsmError::InvalidStringTable(_))
        ));
    }

    #[test]
    fn test_kind_from_path() {
        assert_eq!(
            StringTableKind::from_path(Path::new("Skyrim_English.DLSTRINGS")),
            Some(StringTableKind::DlStrings)
        );
        assert_eq!(
            StringTableKind::from_path(Path::new("a.strings")),
            Some(StringTableKind::Plain)
        );
        assert_eq!(StringTableKind::from_path(Path::new("a.esm")), None);
    }
}
