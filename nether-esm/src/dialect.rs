//! On-disk dialects

use serde::{Deserialize, Serialize};

use crate::tag::{Tag, tags};

/// One of the two supported on-disk conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// 4-byte subrecord length fields, 16-byte record headers
    Legacy,
    /// 2-byte subrecord length fields, 24-byte record headers, localized strings
    Modern,
}

impl Dialect {
    /// Width in bytes of a subrecord length field
    pub const fn length_width(self) -> usize {
        match self {
            Dialect::Legacy => 4,
            Dialect::Modern => 2,
        }
    }

    /// Size of a subrecord header (tag + length)
    pub const fn subrecord_header_len(self) -> usize {
        4 + self.length_width()
    }

    /// Size of a record header
    pub const fn record_header_len(self) -> usize {
        match self {
            Dialect::Legacy => 16,
            Dialect::Modern => 24,
        }
    }

    /// Largest inline string payload accepted, NUL terminator included
    pub const fn max_string_len(self) -> usize {
        match self {
            Dialect::Legacy => 255,
            Dialect::Modern => 511,
        }
    }

    /// Tag of the header record every file of this dialect starts with
    pub const fn file_header_tag(self) -> Tag {
        match self {
            Dialect::Legacy => tags::TES3,
            Dialect::Modern => tags::TES4,
        }
    }

    /// Detect the dialect from the first four bytes of a file
    pub fn sniff(first_tag: Tag) -> Option<Dialect> {
        match first_tag {
            tags::TES3 => Some(Dialect::Legacy),
            tags::TES4 => Some(Dialect::Modern),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_widths() {
        assert_eq!(Dialect::Legacy.subrecord_header_len(), 8);
        assert_eq!(Dialect::Modern.subrecord_header_len(), 6);
        assert_eq!(Dialect::Legacy.max_string_len(), 255);
        assert_eq!(Dialect::Modern.max_string_len(), 511);
    }

    #[test]
    fn test_sniff() {
        assert_eq!(Dialect::sniff(tags::TES3), Some(Dialect::Legacy));
        assert_eq!(Dialect::sniff(tags::TES4), Some(Dialect::Modern));
        assert_eq!(Dialect::sniff(tags::NPC_), None);
    }
}
