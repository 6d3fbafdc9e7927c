//! Inline and fixed-slot string encoding
//!
//! Strings on disk are single-byte encoded (the games use Windows code
//! pages). They are mapped byte-for-char through ISO-8859-1 so that any
//! byte sequence decodes and re-encodes unchanged; characters above U+00FF
//! cannot be represented and are written as `?`.

use std::io::Write;

use crate::cursor::ByteWriter;
use crate::dialect::Dialect;
use crate::error::{EsmError, Result, WarningSink};
use crate::tag::Tag;

/// Width of the fixed name slots used by actor subrecords (item, spell and target ids)
pub const NAME_SLOT_LEN: usize = 32;

pub(crate) fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

pub(crate) fn string_to_bytes(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|c| u8::try_from(c).unwrap_or(b'?'))
        .collect()
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

/// Decode a NUL-terminated inline string subrecord payload.
///
/// The payload length (terminator included) must not exceed the dialect's
/// maximum. Everything from the first NUL on is dropped.
pub fn decode_string(payload: &[u8], tag: Tag, dialect: Dialect) -> Result<String> {
    let max = dialect.max_string_len();
    if payload.len() > max {
        return Err(EsmError::StringTooLong {
            tag,
            len: payload.len(),
            max,
        });
    }
    Ok(bytes_to_string(until_nul(payload)))
}

/// Write `value` as a complete inline string subrecord: header, bytes, NUL.
///
/// Strings longer than the dialect allows are clamped with a warning.
pub fn write_string<W: Write>(
    writer: &mut ByteWriter<W>,
    tag: Tag,
    value: &str,
    warnings: &mut WarningSink<'_>,
) -> Result<()> {
    let mut bytes = string_to_bytes(value);
    let max_visible = writer.dialect().max_string_len() - 1;
    if bytes.len() > max_visible {
        warnings.string_truncated(bytes.len(), max_visible);
        bytes.truncate(max_visible);
    }
    writer.write_subrecord_header(tag, bytes.len() + 1)?;
    writer.write_bytes(&bytes)?;
    writer.write_u8(0)
}

/// Decode a fixed-width name slot.
///
/// A slot without a terminator holds more than `slot.len() - 1` visible
/// characters; the excess is dropped with a warning so that decoding the
/// re-encoded slot yields the same string.
pub fn decode_name_slot(slot: &[u8], warnings: &mut WarningSink<'_>) -> String {
    let visible = until_nul(slot);
    let max_visible = slot.len().saturating_sub(1);
    if visible.len() > max_visible {
        warnings.string_truncated(visible.len(), max_visible);
        return bytes_to_string(&visible[..max_visible]);
    }
    bytes_to_string(visible)
}

/// Write `value` into a fixed-width slot of `slot_len` bytes.
///
/// At most `slot_len - 1` characters are kept (truncation is logged) and the
/// rest of the slot is zero-filled, so the slot is always NUL-terminated.
pub fn write_name_slot<W: Write>(
    writer: &mut ByteWriter<W>,
    value: &str,
    slot_len: usize,
    warnings: &mut WarningSink<'_>,
) -> Result<()> {
    let mut bytes = string_to_bytes(value);
    let max_visible = slot_len.saturating_sub(1);
    if bytes.len() > max_visible {
        warnings.string_truncated(bytes.len(), max_visible);
        bytes.truncate(max_visible);
    }
    writer.write_bytes(&bytes)?;
    writer.write_zeros(slot_len - bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::ByteCursor;
    use crate::tag::tags;

    #[test]
    fn test_decode_string_strips_at_nul() {
        assert_eq!(
            decode_string(b"Hello\0World", tags::FNAM, Dialect::Legacy).unwrap(),
            "Hello"
        );
        assert_eq!(
            decode_string(b"No null", tags::FNAM, Dialect::Legacy).unwrap(),
            "No null"
        );
        assert_eq!(decode_string(b"", tags::FNAM, Dialect::Legacy).unwrap(), "");
    }

    #[test]
    fn test_decode_string_rejects_over_dialect_max() {
        let long = vec![b'a'; 300];
        assert!(matches!(
            decode_string(&long, tags::FNAM, Dialect::Legacy),
            Err(EsmError::StringTooLong {
                len: 300,
                max: 255,
                ..
            })
        ));
        // The modern dialect allows up to 511 bytes.
        assert_eq!(
            decode_string(&long, tags::EDID, Dialect::Modern)
                .unwrap()
                .len(),
            300
        );
    }

    #[test]
    fn test_high_bytes_round_trip() {
        let raw = [b'M', 0xE4, 0xF6, 0x96];
        let decoded = bytes_to_string(&raw);
        assert_eq!(string_to_bytes(&decoded), raw);
    }

    #[test]
    fn test_write_string_legacy_layout() {
        let mut warnings = Vec::new();
        let mut writer = ByteWriter::new(Vec::new(), Dialect::Legacy);
        write_string(
            &mut writer,
            tags::FNAM,
            "Fargoth",
            &mut WarningSink::new(tags::FNAM, &mut warnings),
        )
        .unwrap();
        assert_eq!(writer.into_inner(), b"FNAM\x08\0\0\0Fargoth\0");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_write_string_modern_layout() {
        let mut warnings = Vec::new();
        let mut writer = ByteWriter::new(Vec::new(), Dialect::Modern);
        write_string(
            &mut writer,
            tags::EDID,
            "ActionShieldChange",
            &mut WarningSink::new(tags::EDID, &mut warnings),
        )
        .unwrap();
        assert_eq!(writer.into_inner(), b"EDID\x13\0ActionShieldChange\0");
    }

    #[test]
    fn test_write_string_clamps_to_dialect_max() {
        let mut warnings = Vec::new();
        let mut writer = ByteWriter::new(Vec::new(), Dialect::Legacy);
        let long = "x".repeat(400);
        write_string(
            &mut writer,
            tags::FNAM,
            &long,
            &mut WarningSink::new(tags::FNAM, &mut warnings),
        )
        .unwrap();
        let bytes = writer.into_inner();
        assert_eq!(&bytes[4..8], &255u32.to_le_bytes());
        assert_eq!(bytes.len(), 8 + 255);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_name_slot_truncation_is_idempotent() {
        let mut warnings = Vec::new();
        let forty = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMN";
        assert_eq!(forty.len(), 40);

        let mut writer = ByteWriter::new(Vec::new(), Dialect::Legacy);
        write_name_slot(
            &mut writer,
            forty,
            NAME_SLOT_LEN,
            &mut WarningSink::new(tags::AI_A, &mut warnings),
        )
        .unwrap();
        let slot = writer.into_inner();
        assert_eq!(slot.len(), 32);
        assert_eq!(&slot[..31], &forty.as_bytes()[..31]);
        assert_eq!(slot[31], 0);
        assert_eq!(warnings.len(), 1);

        let mut cursor = ByteCursor::new(&slot);
        let decoded = decode_name_slot(
            cursor.read_exact(32).unwrap(),
            &mut WarningSink::new(tags::AI_A, &mut warnings),
        );
        assert_eq!(decoded, &forty[..31]);
        // Re-decoding an already-truncated slot raises nothing new.
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_name_slot_zero_pads() {
        let mut warnings = Vec::new();
        let mut writer = ByteWriter::new(Vec::new(), Dialect::Legacy);
        write_name_slot(
            &mut writer,
            "gold_001",
            NAME_SLOT_LEN,
            &mut WarningSink::new(tags::NPCO, &mut warnings),
        )
        .unwrap();
        let slot = writer.into_inner();
        assert_eq!(&slot[..8], b"gold_001");
        assert!(slot[8..].iter().all(|&b| b == 0));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unterminated_slot_is_clamped_on_decode() {
        let mut warnings = Vec::new();
        let slot = [b'z'; 32];
        let decoded = decode_name_slot(&slot, &mut WarningSink::new(tags::NPCS, &mut warnings));
        assert_eq!(decoded.len(), 31);
        assert_eq!(warnings.len(), 1);
    }
}
