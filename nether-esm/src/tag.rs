//! Four-byte record and subrecord tags

use std::fmt;

use serde::{Serialize, Serializer};

/// Four-character code identifying a record or subrecord type
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Tag(*bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for Tag {
    fn from(bytes: [u8; 4]) -> Self {
        Tag(bytes)
    }
}

// Printable ASCII is shown as-is, anything else as \xNN so a corrupt tag
// never breaks a log line.
impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02X}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}

impl Serialize for Tag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Known tags
pub mod tags {
    use super::Tag;

    // File structure
    pub const TES3: Tag = Tag::new(b"TES3");
    pub const TES4: Tag = Tag::new(b"TES4");
    pub const GRUP: Tag = Tag::new(b"GRUP");
    pub const XXXX: Tag = Tag::new(b"XXXX");

    // Record types
    pub const NPC_: Tag = Tag::new(b"NPC_");
    pub const CREA: Tag = Tag::new(b"CREA");
    pub const MISC: Tag = Tag::new(b"MISC");

    // Shared subrecords
    pub const NAME: Tag = Tag::new(b"NAME");
    pub const EDID: Tag = Tag::new(b"EDID");
    pub const MODL: Tag = Tag::new(b"MODL");
    pub const FNAM: Tag = Tag::new(b"FNAM");
    pub const FULL: Tag = Tag::new(b"FULL");
    pub const SCRI: Tag = Tag::new(b"SCRI");
    pub const DATA: Tag = Tag::new(b"DATA");
    pub const FLAG: Tag = Tag::new(b"FLAG");
    pub const XSCL: Tag = Tag::new(b"XSCL");

    // Actor subrecords
    pub const RNAM: Tag = Tag::new(b"RNAM");
    pub const CNAM: Tag = Tag::new(b"CNAM");
    pub const ANAM: Tag = Tag::new(b"ANAM");
    pub const BNAM: Tag = Tag::new(b"BNAM");
    pub const KNAM: Tag = Tag::new(b"KNAM");
    pub const NPDT: Tag = Tag::new(b"NPDT");
    pub const NPCO: Tag = Tag::new(b"NPCO");
    pub const NPCS: Tag = Tag::new(b"NPCS");
    pub const AIDT: Tag = Tag::new(b"AIDT");

    // Behavior packages
    pub const AI_W: Tag = Tag::new(b"AI_W");
    pub const AI_T: Tag = Tag::new(b"AI_T");
    pub const AI_F: Tag = Tag::new(b"AI_F");
    pub const AI_E: Tag = Tag::new(b"AI_E");
    pub const AI_A: Tag = Tag::new(b"AI_A");
    pub const CNDT: Tag = Tag::new(b"CNDT");

    // Travel destinations
    pub const DODT: Tag = Tag::new(b"DODT");
    pub const DNAM: Tag = Tag::new(b"DNAM");

    // Modern item subrecords
    pub const VMAD: Tag = Tag::new(b"VMAD");
    pub const OBND: Tag = Tag::new(b"OBND");
    pub const MODT: Tag = Tag::new(b"MODT");
    pub const ICON: Tag = Tag::new(b"ICON");
    pub const KSIZ: Tag = Tag::new(b"KSIZ");
    pub const KWDA: Tag = Tag::new(b"KWDA");
    pub const YNAM: Tag = Tag::new(b"YNAM");
    pub const ZNAM: Tag = Tag::new(b"ZNAM");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_escapes_non_printable() {
        assert_eq!(tags::NPC_.to_string(), "NPC_");
        assert_eq!(Tag([b'A', 0, b'B', 0xFF]).to_string(), "A\\x00B\\xFF");
    }

    #[test]
    fn test_ordering_follows_bytes() {
        assert!(tags::ANAM < tags::BNAM);
        assert!(tags::AI_A < tags::AI_W);
    }
}
