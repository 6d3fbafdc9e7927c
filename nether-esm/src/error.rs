//! Error and warning types for record decoding and encoding

use std::io;

use crate::fixed::FixedLen;
use crate::tag::Tag;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, EsmError>;

/// Fatal decode/encode failures.
///
/// Every variant aborts the record currently being processed. Whether that
/// aborts the whole file is decided by the file reader's
/// [`RecordErrorPolicy`](crate::RecordErrorPolicy).
#[derive(Debug, thiserror::Error)]
pub enum EsmError {
    /// Subrecord tag not allowed in this record type or position
    #[error("unexpected subrecord {tag} in record {record}")]
    UnexpectedTag { record: Tag, tag: Tag },

    /// At-most-one subrecord seen a second time
    #[error("record {record} contains more than one {tag} subrecord")]
    DuplicateTag { record: Tag, tag: Tag },

    /// Required subrecord absent at end of record
    #[error("record {record} is missing required subrecord {tag}")]
    MissingRequiredTag { record: Tag, tag: Tag },

    /// Fixed-size payload with a declared length outside the accepted set
    #[error("subrecord {tag} has invalid length {found} (expected {expected})")]
    LengthMismatch {
        tag: Tag,
        expected: FixedLen,
        found: usize,
    },

    /// Underlying data ended before the requested number of bytes
    #[error("data truncated: needed {needed} bytes, only {available} available")]
    Truncated { needed: usize, available: usize },

    /// Read would cross the declared size of the enclosing record or subrecord
    #[error("read of {requested} bytes overruns declared size ({remaining} bytes left)")]
    Overrun { requested: usize, remaining: usize },

    /// Declared size was not fully consumed
    #[error("{remaining} bytes left unread at end of {tag}")]
    Underrun { tag: Tag, remaining: usize },

    /// Inline string longer than the dialect allows
    #[error("string in subrecord {tag} is {len} bytes long (max {max})")]
    StringTooLong { tag: Tag, len: usize, max: usize },

    /// Localized index not present in the string table
    #[error("string index {index:#010X} of subrecord {tag} not found in string table")]
    StringTableMiss { tag: Tag, index: u32 },

    /// String value kind does not match the session's localization flag
    #[error("subrecord {tag} holds a {found} string but the session is {expected}")]
    LocalizationMismatch {
        tag: Tag,
        found: &'static str,
        expected: &'static str,
    },

    /// Attachment subrecord with no eligible preceding entry
    #[error("subrecord {tag} cannot attach to preceding {}", .previous.map_or_else(|| "nothing".to_string(), |t| t.to_string()))]
    MisplacedAttachment { tag: Tag, previous: Option<Tag> },

    /// Payload too large for the dialect's length field
    #[error("subrecord {tag} payload of {len} bytes does not fit the length field")]
    LengthOverflow { tag: Tag, len: usize },

    /// File does not start with a known header record
    #[error("not a valid plugin/master file (first record is {0})")]
    InvalidFileHeader(Tag),

    /// Record uses a feature this codec does not implement
    #[error("record {tag}: {feature} is not supported")]
    UnsupportedFeature { tag: Tag, feature: &'static str },

    /// Malformed string table file
    #[error("invalid string table: {0}")]
    InvalidStringTable(String),

    /// Unparseable reader configuration
    #[error("invalid reader configuration: {0}")]
    Config(String),

    /// Failure inside a specific record of a file
    #[error("record {tag} at offset {offset:#X}: {source}")]
    Record {
        tag: Tag,
        offset: usize,
        #[source]
        source: Box<EsmError>,
    },

    /// I/O failure of the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Non-fatal condition noticed while decoding or encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Subrecord the warning belongs to
    pub tag: Tag,
    pub kind: WarningKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// String did not fit its slot and was clamped
    StringTruncated { original_len: usize, kept_len: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            WarningKind::StringTruncated {
                original_len,
                kept_len,
            } => write!(
                f,
                "string in {} truncated from {} to {} bytes",
                self.tag, original_len, kept_len
            ),
        }
    }
}

/// Collects warnings for one subrecord and mirrors them to the log.
pub struct WarningSink<'a> {
    tag: Tag,
    warnings: &'a mut Vec<Warning>,
}

impl<'a> WarningSink<'a> {
    pub fn new(tag: Tag, warnings: &'a mut Vec<Warning>) -> Self {
        Self { tag, warnings }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn string_truncated(&mut self, original_len: usize, kept_len: usize) {
        let warning = Warning {
            tag: self.tag,
            kind: WarningKind::StringTruncated {
                original_len,
                kept_len,
            },
        };
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

impl EsmError {
    /// Wrap this error with the record it occurred in
    pub fn in_record(self, tag: Tag, offset: usize) -> Self {
        EsmError::Record {
            tag,
            offset,
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through [`EsmError::Record`] wrappers
    pub fn root(&self) -> &EsmError {
        match self {
            EsmError::Record { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags;

    #[test]
    fn test_error_display() {
        assert_eq!(
            EsmError::DuplicateTag {
                record: tags::NPC_,
                tag: tags::FNAM
            }
            .to_string(),
            "record NPC_ contains more than one FNAM subrecord"
        );
        assert_eq!(
            EsmError::MisplacedAttachment {
                tag: tags::CNDT,
                previous: None
            }
            .to_string(),
            "subrecord CNDT cannot attach to preceding nothing"
        );
        assert_eq!(
            EsmError::LengthMismatch {
                tag: tags::NPDT,
                expected: FixedLen::OneOf(&[12, 52]),
                found: 13
            }
            .to_string(),
            "subrecord NPDT has invalid length 13 (expected 12 or 52)"
        );
    }

    #[test]
    fn test_root_unwraps_record_context() {
        let err = EsmError::StringTableMiss {
            tag: tags::FULL,
            index: 7,
        }
        .in_record(tags::MISC, 0x40);
        assert!(matches!(err.root(), EsmError::StringTableMiss { index: 7, .. }));
        assert!(err.to_string().starts_with("record MISC at offset 0x40"));
    }

    #[test]
    fn test_warning_sink_records_truncation() {
        let mut warnings = Vec::new();
        WarningSink::new(tags::AI_F, &mut warnings).string_truncated(40, 31);
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0].to_string(),
            "string in AI_F truncated from 40 to 31 bytes"
        );
    }
}
