//! The ZIP archive filesystem.

use crate::error::{ArchiveError, Result};
use crate::fs::{ArchiveFs, FileKind, Metadata, normalize};
use crate::zip::data::materialize;
use crate::zip::index::ZipIndex;
use crate::zip::structures::FileEntry;

/// Read-only filesystem over a ZIP archive held in memory.
///
/// Construction parses the central directory once; every later operation is
/// a lookup in the resulting index plus, for reads, a fresh decompression of
/// the requested file.
pub struct ZipFs<'a> {
    data: &'a [u8],
    index: ZipIndex,
}

impl<'a> ZipFs<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let index = ZipIndex::parse(data)?;
        Ok(Self { data, index })
    }

    /// Number of central directory records, directories included.
    pub fn file_count(&self) -> usize {
        self.index.file_count()
    }

    /// Archive-level comment from the end-of-central-directory record.
    pub fn comment(&self) -> &str {
        &self.index.eocd.comment
    }

    /// All central directory records, in archive order.
    pub fn file_entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.index.file_entries()
    }

    fn metadata_for(&self, path: &str) -> Result<Metadata> {
        if self.index.is_dir(path) {
            // Synthesized directories have no record and report zero times.
            let mtime = self
                .index
                .dir_entry(path)
                .map(|entry| entry.modified_unix())
                .unwrap_or(0);
            return Ok(Metadata {
                kind: FileKind::Directory,
                size: 0,
                mode: 0o555,
                mtime,
                atime: mtime,
                ctime: mtime,
            });
        }
        let entry = self
            .index
            .entry(path)
            .ok_or_else(|| ArchiveError::NotFound(path.to_string()))?;
        let mtime = entry.modified_unix();
        Ok(Metadata {
            kind: FileKind::File,
            size: entry.uncompressed_size as u64,
            mode: 0o555,
            mtime,
            atime: mtime,
            ctime: mtime,
        })
    }
}

impl ArchiveFs for ZipFs<'_> {
    fn stat(&self, path: &str) -> Result<Metadata> {
        self.metadata_for(&normalize(path))
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize(path);
        if self.index.is_dir(&path) {
            return Err(ArchiveError::IsADirectory(path));
        }
        let entry = self
            .index
            .entry(&path)
            .ok_or_else(|| ArchiveError::NotFound(path.clone()))?;
        materialize(self.data, entry)
    }

    fn read_dir(&self, path: &str) -> Result<Vec<String>> {
        let path = normalize(path);
        match self.index.children(&path) {
            Some(children) => Ok(children.to_vec()),
            None if self.index.entry(&path).is_some() => Err(ArchiveError::NotADirectory(path)),
            None => Err(ArchiveError::NotFound(path)),
        }
    }
}
