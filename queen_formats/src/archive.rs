use std::fs::File;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail, ensure};
use byteorder::{BigEndian, ByteOrder};
use memmap2::{Mmap, MmapOptions};
use serde::Serialize;

use crate::writer::ByteWriter;

pub const ARCHIVE_MAGIC: &[u8; 4] = b"QRES";
const HEADER_SIZE: usize = 8;
const ENTRY_SIZE: usize = 20;
const NAME_SIZE: usize = 12;

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

impl ArchiveEntry {
    pub fn data_range(&self) -> Range<usize> {
        let start = self.offset as usize;
        start..start + self.size as usize
    }
}

/// Memory-mapped `QRES` resource container.
#[derive(Debug)]
pub struct ResourceArchive {
    path: PathBuf,
    mmap: Mmap,
    entries: Vec<ArchiveEntry>,
}

impl ResourceArchive {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let file = File::open(&path_buf)
            .with_context(|| format!("opening resource archive at {}", path_buf.display()))?;
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .with_context(|| format!("memory-mapping resource archive {}", path_buf.display()))?;

        let entries = parse_entries(&mmap)
            .with_context(|| format!("parsing resource archive {}", path_buf.display()))?;

        Ok(ResourceArchive {
            path: path_buf,
            mmap,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn find_entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    pub fn read_entry_bytes(&self, entry: &ArchiveEntry) -> &[u8] {
        &self.mmap[entry.data_range()]
    }

    pub fn extract_entry<P: AsRef<Path>>(&self, entry: &ArchiveEntry, dest: P) -> Result<()> {
        let bytes = self.read_entry_bytes(entry);
        let mut file = File::create(dest.as_ref())
            .with_context(|| format!("creating {}", dest.as_ref().display()))?;
        file.write_all(bytes)
            .with_context(|| format!("writing {}", dest.as_ref().display()))?;
        Ok(())
    }
}

fn parse_entries(data: &[u8]) -> Result<Vec<ArchiveEntry>> {
    ensure!(
        data.len() >= HEADER_SIZE,
        "resource archive is too small to contain a header"
    );
    if &data[0..4] != ARCHIVE_MAGIC {
        bail!("resource archive missing QRES signature");
    }

    let count = BigEndian::read_u32(&data[4..8]) as usize;
    let table_len = count
        .checked_mul(ENTRY_SIZE)
        .ok_or_else(|| anyhow!("resource archive entry count overflow"))?;
    ensure!(
        HEADER_SIZE + table_len <= data.len(),
        "resource archive truncated inside its entry table"
    );

    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let base = HEADER_SIZE + index * ENTRY_SIZE;
        let raw = &data[base..base + ENTRY_SIZE];
        let name_bytes = &raw[..NAME_SIZE];
        let name_len = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_SIZE);
        ensure!(name_len > 0, "resource entry {index} has an empty name");
        let name = String::from_utf8_lossy(&name_bytes[..name_len]).into_owned();

        let offset = BigEndian::read_u32(&raw[12..16]);
        let size = BigEndian::read_u32(&raw[16..20]);
        let end = (offset as usize)
            .checked_add(size as usize)
            .ok_or_else(|| anyhow!("resource entry {index} size overflow"))?;
        ensure!(
            end <= data.len(),
            "resource entry {name} data extends beyond file"
        );

        entries.push(ArchiveEntry { name, offset, size });
    }
    Ok(entries)
}

/// Serialises named blobs into a `QRES` container.
pub fn build_archive(files: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut writer = ByteWriter::new();
    writer.bytes(ARCHIVE_MAGIC).u32(files.len() as u32);

    let mut offset = HEADER_SIZE + files.len() * ENTRY_SIZE;
    for (name, data) in files {
        ensure!(
            !name.is_empty() && name.len() <= NAME_SIZE && name.is_ascii(),
            "archive entry name {name:?} must be 1..={NAME_SIZE} ASCII bytes"
        );
        let mut padded = [0u8; NAME_SIZE];
        padded[..name.len()].copy_from_slice(name.as_bytes());
        writer
            .bytes(&padded)
            .u32(offset as u32)
            .u32(data.len() as u32);
        offset += data.len();
    }
    for (_, data) in files {
        writer.bytes(data);
    }
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_built_archive() {
        let mut file = NamedTempFile::new().unwrap();
        let data = build_archive(&[("QUEEN.JAS", b"ABCD"), ("c12a.cut", b"xy")]).unwrap();
        file.write_all(&data).unwrap();

        let archive = ResourceArchive::open(file.path()).unwrap();
        assert_eq!(archive.entries().len(), 2);
        let entry = archive.find_entry("c12A.CUT").expect("case-insensitive lookup");
        assert_eq!(entry.size, 2);
        assert_eq!(archive.read_entry_bytes(entry), b"xy");
        let first = &archive.entries()[0];
        assert_eq!(first.offset as usize, HEADER_SIZE + 2 * ENTRY_SIZE);
        assert_eq!(archive.read_entry_bytes(first), b"ABCD");
    }

    #[test]
    fn rejects_wrong_signature() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"LABN\0\0\0\0").unwrap();
        let err = ResourceArchive::open(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("QRES"));
    }

    #[test]
    fn rejects_entry_past_end() {
        let mut data = build_archive(&[("A.CUT", b"1234")]).unwrap();
        data.truncate(data.len() - 1);
        assert!(parse_entries(&data).is_err());
    }
}
