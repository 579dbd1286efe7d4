//! The ISO9660 archive filesystem.

use log::debug;

use crate::error::{ArchiveError, Result};
use crate::fs::{ArchiveFs, FileKind, Metadata, join_relative, normalize};
use crate::iso::directory::Directory;
use crate::iso::record::DirectoryRecord;
use crate::iso::susp::SuspEntry;
use crate::iso::volume::{VolumeDescriptor, VolumeKind, select_volume};

/// Rock Ridge extension identifier carried by the root's ER entry.
const ROCK_RIDGE_IDENTIFIER: &[u8] = b"IEEE_P1282";

/// Symlink chains longer than this are treated as cycles.
const MAX_SYMLINK_DEPTH: usize = 40;

/// Read-only filesystem over an ISO9660 image held in memory.
///
/// Construction selects the volume descriptor (Joliet over Primary) and
/// probes the root directory for Rock Ridge. Lookups walk directory extents
/// from the root on every call; the walk is pure recomputation over the
/// immutable image, so there is no cache to manage.
pub struct IsoFs<'a> {
    data: &'a [u8],
    descriptor: VolumeDescriptor,
    root: DirectoryRecord,
    rock_ridge_skip: Option<u8>,
}

impl<'a> IsoFs<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let descriptor = select_volume(data)?;
        let root = DirectoryRecord::parse(
            data,
            descriptor.root_record_offset(),
            descriptor.encoding,
            None,
        )?;
        if !root.is_directory() {
            return Err(ArchiveError::Format(
                "root directory record is not a directory".into(),
            ));
        }
        let rock_ridge_skip = detect_rock_ridge(data, &root, &descriptor);
        debug!(
            "mounted {:?} volume '{}' (version {}, block size {}), rock ridge: {}",
            descriptor.kind,
            descriptor.label,
            descriptor.version,
            descriptor.logical_block_size,
            rock_ridge_skip.is_some()
        );
        Ok(Self { data, descriptor, root, rock_ridge_skip })
    }

    /// Volume label from the selected descriptor.
    pub fn label(&self) -> &str {
        &self.descriptor.label
    }

    pub fn is_joliet(&self) -> bool {
        self.descriptor.kind == VolumeKind::Supplementary
    }

    pub fn has_rock_ridge(&self) -> bool {
        self.rock_ridge_skip.is_some()
    }

    fn read_directory(&self, record: &DirectoryRecord) -> Result<Directory> {
        Directory::read(
            self.data,
            record,
            self.descriptor.encoding,
            self.rock_ridge_skip,
        )
    }

    fn lookup(&self, path: &str) -> Result<DirectoryRecord> {
        self.lookup_bounded(path, 0)
    }

    fn lookup_bounded(&self, path: &str, depth: usize) -> Result<DirectoryRecord> {
        if depth > MAX_SYMLINK_DEPTH {
            return Err(ArchiveError::Malformed(format!(
                "symlink chain too deep resolving {path}"
            )));
        }
        let path = normalize(path);
        let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let mut current = self.root.clone();
        for (position, component) in components.iter().enumerate() {
            if !current.is_directory() {
                return Err(ArchiveError::NotADirectory(path.clone()));
            }
            let dir = self.read_directory(&current)?;
            let child = dir
                .get(component)
                .ok_or_else(|| ArchiveError::NotFound(path.clone()))?;
            if let Some(target) = child.symlink_target() {
                // The target is relative to the directory holding the link.
                let base = join_components(&components[..position]);
                let mut resolved = join_relative(&base, &target);
                let terminal = position + 1 == components.len();
                for rest in &components[position + 1..] {
                    if !resolved.ends_with('/') {
                        resolved.push('/');
                    }
                    resolved.push_str(rest);
                }
                return match self.lookup_bounded(&resolved, depth + 1) {
                    // A dangling link still exists; hand back the link record
                    // so stat can report it as a symlink.
                    Err(ArchiveError::NotFound(_)) if terminal => Ok(child.clone()),
                    other => other,
                };
            }
            current = child.clone();
        }
        Ok(current)
    }

    fn metadata_for(&self, record: &DirectoryRecord) -> Metadata {
        // Resolvable links never reach here; a symlink record means lookup
        // could not follow it to a target.
        let kind = if record.is_symlink() {
            FileKind::Symlink
        } else if record.is_directory() {
            FileKind::Directory
        } else {
            FileKind::File
        };
        let size = match kind {
            FileKind::Directory => 0,
            FileKind::Symlink => record
                .symlink_target()
                .map(|target| target.len() as u64)
                .unwrap_or(0),
            FileKind::File => record.data_length as u64,
        };
        let mode = match record.posix_attributes() {
            Some((mode, ..)) => mode & 0o555,
            None => 0o555,
        };
        let recorded = record.recorded_at.unwrap_or(0);
        let stamps = record.timestamps();
        Metadata {
            kind,
            size,
            mode,
            mtime: stamps.and_then(|t| t.modify).unwrap_or(recorded),
            atime: stamps.and_then(|t| t.access).unwrap_or(recorded),
            ctime: stamps.and_then(|t| t.creation).unwrap_or(recorded),
        }
    }
}

impl ArchiveFs for IsoFs<'_> {
    fn stat(&self, path: &str) -> Result<Metadata> {
        let record = self.lookup(path)?;
        Ok(self.metadata_for(&record))
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let record = self.lookup(path)?;
        if record.is_symlink() {
            // Only dangling links survive lookup; their content is missing.
            return Err(ArchiveError::NotFound(normalize(path)));
        }
        if record.is_directory() {
            return Err(ArchiveError::IsADirectory(normalize(path)));
        }
        let start = record.extent_offset();
        let end = start
            .checked_add(record.data_length as usize)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                ArchiveError::Malformed(format!("file extent extends past the image: {path}"))
            })?;
        Ok(self.data[start..end].to_vec())
    }

    fn read_dir(&self, path: &str) -> Result<Vec<String>> {
        let record = self.lookup(path)?;
        if record.is_symlink() || !record.is_directory() {
            return Err(ArchiveError::NotADirectory(normalize(path)));
        }
        Ok(self.read_directory(&record)?.names())
    }
}

fn join_components(components: &[&str]) -> String {
    if components.is_empty() {
        return "/".into();
    }
    let mut out = String::new();
    for component in components {
        out.push('/');
        out.push_str(component);
    }
    out
}

/// Probe the root directory's current-directory record for Rock Ridge.
///
/// The convention: the record's first system use entry is SP, and the list
/// also carries either the (deprecated) RR marker or an ER entry naming
/// IEEE P1282. The SP skip value then applies to every record in the tree.
/// Anything short of that means a plain ISO9660 or Joliet tree; absence is
/// not an error.
fn detect_rock_ridge(
    data: &[u8],
    root: &DirectoryRecord,
    descriptor: &VolumeDescriptor,
) -> Option<u8> {
    let dot =
        DirectoryRecord::parse(data, root.extent_offset(), descriptor.encoding, Some(0)).ok()?;
    let SuspEntry::Sp { skip } = *dot.susp_entries.first()? else {
        return None;
    };
    let announced = dot.susp_entries.iter().any(|entry| match entry {
        SuspEntry::Rr => true,
        SuspEntry::Er { identifier } => identifier == ROCK_RIDGE_IDENTIFIER,
        _ => false,
    });
    announced.then_some(skip)
}
