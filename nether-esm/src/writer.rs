//! File-level writer

use std::io::Write;
use std::path::Path;

use crate::cursor::ByteWriter;
use crate::dialect::Dialect;
use crate::error::{EsmError, Result, Warning};
use crate::file::{Entry, EsmFile, GROUP_HEADER_LEN, Group};
use crate::localized::Session;
use crate::tag::tags;

/// Writes an [`EsmFile`] back to bytes, recomputing record and group sizes
pub struct EsmWriter<W: Write> {
    writer: ByteWriter<W>,
    warnings: Vec<Warning>,
}

impl<W: Write> EsmWriter<W> {
    pub fn new(inner: W, dialect: Dialect) -> Self {
        Self {
            writer: ByteWriter::new(inner, dialect),
            warnings: Vec::new(),
        }
    }

    /// Write the header record followed by every entry
    pub fn write_file(&mut self, file: &EsmFile) -> Result<()> {
        let session = Session {
            localized: file.localized,
            ..Session::unlocalized(self.writer.dialect())
        };
        file.header.record.encode(&mut self.writer)?;
        write_entries(&mut self.writer, &file.entries, &session, &mut self.warnings)?;
        tracing::debug!(
            bytes = self.writer.bytes_written(),
            warnings = self.warnings.len(),
            "file written"
        );
        Ok(())
    }

    /// Strings clamped while writing
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

fn write_entries<W: Write>(
    writer: &mut ByteWriter<W>,
    entries: &[Entry],
    session: &Session<'_>,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    for entry in entries {
        match entry {
            Entry::Record(record) => record.encode(writer, session, warnings)?,
            Entry::Group(group) => write_group(writer, group, session, warnings)?,
        }
    }
    Ok(())
}

fn write_group<W: Write>(
    writer: &mut ByteWriter<W>,
    group: &Group,
    session: &Session<'_>,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    if writer.dialect() == Dialect::Legacy {
        return Err(EsmError::UnsupportedFeature {
            tag: tags::GRUP,
            feature: "groups in a legacy file",
        });
    }

    let mut body = ByteWriter::new(Vec::new(), writer.dialect());
    write_entries(&mut body, &group.entries, session, warnings)?;
    let body = body.into_inner();
    let len = GROUP_HEADER_LEN + body.len();
    let size = u32::try_from(len).map_err(|_| EsmError::LengthOverflow {
        tag: tags::GRUP,
        len,
    })?;

    writer.write_tag(tags::GRUP)?;
    writer.write_u32(size)?;
    writer.write_bytes(&group.label)?;
    writer.write_i32(group.group_type)?;
    writer.write_u32(group.stamp)?;
    writer.write_u32(group.unknown)?;
    writer.write_bytes(&body)
}

/// Encode `file` into a byte vector
pub fn to_bytes(file: &EsmFile) -> Result<Vec<u8>> {
    let mut writer = EsmWriter::new(Vec::new(), file.dialect);
    writer.write_file(file)?;
    Ok(writer.into_inner())
}

/// Encode `file` and write it to `path`
pub fn write_file(file: &EsmFile, path: &Path) -> Result<Vec<Warning>> {
    let mut writer = EsmWriter::new(Vec::new(), file.dialect);
    writer.write_file(file)?;
    let warnings = writer.warnings().to_vec();
    std::fs::write(path, writer.into_inner())?;
    Ok(warnings)
}
