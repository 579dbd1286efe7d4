//! Archive-wide index built from the central directory.
//!
//! A ZIP archive is read back to front: locate the end-of-central-directory
//! record by scanning backwards from the end of the buffer, then walk the
//! central directory it points at. Local file headers are never consulted
//! here; they only matter once a file's bytes are requested.

use std::collections::HashMap;

use log::{debug, warn};

use crate::error::{ArchiveError, Result};
use crate::reader::u32_at;
use crate::zip::structures::{EndOfCentralDirectory, FileEntry};

/// Longest possible distance from the EOCD signature to the end of the
/// archive: the 22-byte fixed record plus a maximal 65535-byte comment.
const MAX_EOCD_SCAN: usize = EndOfCentralDirectory::SIZE + u16::MAX as usize;

/// Path-keyed view of an archive's central directory.
///
/// `entries` holds every central directory record, files and directories
/// alike. `files` and `dir_entries` map normalized absolute paths to
/// positions in it; `dirs` maps directory paths to their direct children in
/// archive order. Directory-ness of a path is answered from `dirs` alone, so
/// directories synthesized from file paths and directories with explicit
/// records behave identically.
pub struct ZipIndex {
    pub eocd: EndOfCentralDirectory,
    entries: Vec<FileEntry>,
    files: HashMap<String, usize>,
    dir_entries: HashMap<String, usize>,
    dirs: HashMap<String, Vec<String>>,
}

impl ZipIndex {
    /// Parse the archive's central directory into a path index.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let eocd_offset = locate_eocd(data)?;
        let eocd = EndOfCentralDirectory::parse(data, eocd_offset)?;
        validate(&eocd)?;
        debug!(
            "central directory: {} entries, {} bytes at offset {}",
            eocd.total_entry_count, eocd.cd_size, eocd.cd_offset
        );

        let entries = walk_central_directory(data, &eocd)?;

        let mut index = Self {
            eocd,
            entries: Vec::new(),
            files: HashMap::new(),
            dir_entries: HashMap::new(),
            dirs: HashMap::from([("/".to_string(), Vec::new())]),
        };
        for entry in entries {
            index.insert(entry)?;
        }
        Ok(index)
    }

    fn insert(&mut self, entry: FileEntry) -> Result<()> {
        if entry.name.starts_with('/') {
            return Err(ArchiveError::Permission(format!(
                "absolute path in archive: {}",
                entry.name
            )));
        }
        let name = entry.name.strip_suffix('/').unwrap_or(&entry.name);
        if name.is_empty() {
            return Ok(());
        }
        let path = format!("/{name}");
        self.register_ancestors(&path);
        let is_directory = entry.is_directory();
        let slot = self.entries.len();
        self.entries.push(entry);
        if is_directory {
            self.dirs.entry(path.clone()).or_default();
            self.dir_entries.insert(path, slot);
        } else {
            self.files.insert(path, slot);
        }
        Ok(())
    }

    /// Make sure every ancestor directory of `path` exists and lists its
    /// child, synthesizing directories that have no record of their own.
    fn register_ancestors(&mut self, path: &str) {
        let mut parent = String::from("/");
        let mut components = path[1..].split('/').peekable();
        while let Some(component) = components.next() {
            let children = self.dirs.entry(parent.clone()).or_default();
            if !children.iter().any(|c| c == component) {
                children.push(component.to_string());
            }
            if components.peek().is_some() {
                if parent.len() > 1 {
                    parent.push('/');
                }
                parent.push_str(component);
            }
        }
    }

    /// Look up a file entry by normalized absolute path.
    pub fn entry(&self, path: &str) -> Option<&FileEntry> {
        self.files.get(path).map(|&i| &self.entries[i])
    }

    /// Explicit directory record for a path, if the archive carried one.
    /// Synthesized directories have no record and return `None`.
    pub fn dir_entry(&self, path: &str) -> Option<&FileEntry> {
        self.dir_entries.get(path).map(|&i| &self.entries[i])
    }

    /// Whether the path names a directory, explicit or synthesized.
    pub fn is_dir(&self, path: &str) -> bool {
        self.dirs.contains_key(path)
    }

    /// Direct children of a directory, in archive order.
    pub fn children(&self, path: &str) -> Option<&[String]> {
        self.dirs.get(path).map(|v| v.as_slice())
    }

    /// Number of central directory records in the index, directories
    /// included.
    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    /// All central directory records in archive order.
    pub fn file_entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter()
    }
}

/// Scan backwards for the end-of-central-directory signature.
///
/// The record sits at least 22 bytes from the end and at most 22 + 65535
/// (the comment length field is a u16). The first signature found walking
/// backwards wins, so four comment bytes that happen to spell the magic are
/// accepted; resolving that ambiguity would require validating the whole
/// candidate record and real encoders do not produce such comments.
fn locate_eocd(data: &[u8]) -> Result<usize> {
    let max_distance = MAX_EOCD_SCAN.min(data.len());
    for distance in EndOfCentralDirectory::SIZE..=max_distance {
        let offset = data.len() - distance;
        if u32_at(data, offset) == Some(EndOfCentralDirectory::SIGNATURE) {
            return Ok(offset);
        }
    }
    Err(ArchiveError::Format(
        "end of central directory record not found".into(),
    ))
}

fn validate(eocd: &EndOfCentralDirectory) -> Result<()> {
    if eocd.disk_number != eocd.cd_disk_number {
        return Err(ArchiveError::Unsupported(
            "spanned multi-disk archives".into(),
        ));
    }
    if eocd.cd_offset == 0xFFFFFFFF {
        return Err(ArchiveError::Unsupported("ZIP64 archives".into()));
    }
    Ok(())
}

/// Walk central directory records from `cd_offset` until `cd_size` bytes are
/// consumed. A record with a bad signature fails the whole parse; a record
/// that runs past the buffer or crosses the declared end stops the walk and
/// everything collected so far is kept.
fn walk_central_directory(data: &[u8], eocd: &EndOfCentralDirectory) -> Result<Vec<FileEntry>> {
    let declared_end = eocd.cd_offset as usize + eocd.cd_size as usize;
    let end = declared_end.min(data.len());
    let mut entries = Vec::with_capacity(eocd.total_entry_count as usize);
    let mut pos = eocd.cd_offset as usize;
    while pos < end {
        let entry = match FileEntry::parse(data, pos) {
            Ok(entry) => entry,
            Err(err @ ArchiveError::Format(_)) => return Err(err),
            Err(err) => {
                warn!("central directory walk stopped at offset {pos}: {err}");
                break;
            }
        };
        let next = pos + entry.total_size();
        if next > end {
            warn!("central directory record at offset {pos} crosses the declared end");
            break;
        }
        entries.push(entry);
        pos = next;
    }
    Ok(entries)
}
