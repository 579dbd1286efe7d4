//! Directory records: the per-entry metadata unit of an ISO9660 image.

use crate::error::{ArchiveError, Result};
use crate::iso::susp::{
    self, SECTOR_SIZE, SlComponent, SuspEntry, Timestamps, name_flags,
};
use crate::reader::ByteReader;
use crate::text::{TextEncoding, decode};

/// Directory bit of the file flags byte.
const FLAG_DIRECTORY: u8 = 1 << 1;

/// One parsed directory record.
///
/// Integer fields are stored in both-endian form on disk; the little-endian
/// half is read. The system use area is decoded eagerly at parse time so
/// Rock Ridge questions (name, target, permissions) are plain accessors.
#[derive(Debug, Clone)]
pub struct DirectoryRecord {
    /// On-disk record length, including the system use area.
    pub length: u8,
    pub extended_attr_len: u8,
    /// Logical block address of the entry's data.
    pub extent_lba: u32,
    /// Data length in bytes.
    pub data_length: u32,
    /// Recording time, seconds since the Unix epoch.
    pub recorded_at: Option<i64>,
    pub flags: u8,
    pub volume_sequence: u16,
    /// Raw file identifier bytes, undecoded.
    identifier: Vec<u8>,
    encoding: TextEncoding,
    /// Decoded system use entries (empty when the area is absent).
    pub susp_entries: Vec<SuspEntry>,
}

impl DirectoryRecord {
    /// Parse the record at `offset`. `rock_ridge_skip` is the SP skip value
    /// once Rock Ridge has been detected, or `None` before detection (the
    /// system use area then starts right after the identifier padding).
    pub fn parse(
        data: &[u8],
        offset: usize,
        encoding: TextEncoding,
        rock_ridge_skip: Option<u8>,
    ) -> Result<Self> {
        let mut r = ByteReader::at(data, offset)?;
        let length = r.read_u8()?;
        if length == 0 {
            return Err(ArchiveError::Malformed(format!(
                "zero-length directory record at offset {offset}"
            )));
        }
        let extended_attr_len = r.read_u8()?;
        let extent_lba = r.read_u32()?;
        r.skip(4)?;
        let data_length = r.read_u32()?;
        r.skip(4)?;
        let recorded_at = susp::short_timestamp_to_unix(r.bytes(7)?);
        let flags = r.read_u8()?;
        r.skip(2)?; // file unit size, interleave gap
        let volume_sequence = r.read_u16()?;
        r.skip(2)?;
        let id_len = r.read_u8()? as usize;
        let identifier = r.bytes(id_len)?.to_vec();

        // The system use area starts after the identifier, padded to an
        // even offset within the record, plus the Rock Ridge skip.
        let mut susp_start = 33 + id_len;
        if susp_start % 2 == 1 {
            susp_start += 1;
        }
        susp_start += rock_ridge_skip.unwrap_or(0) as usize;
        let susp_entries = if rock_ridge_skip.is_some() && susp_start < length as usize {
            susp::decode_entries(data, offset + susp_start, length as usize - susp_start)?
        } else {
            Vec::new()
        };

        Ok(Self {
            length,
            extended_attr_len,
            extent_lba,
            data_length,
            recorded_at,
            flags,
            volume_sequence,
            identifier,
            encoding,
            susp_entries,
        })
    }

    /// Relocated directories are represented by a file-flagged placeholder
    /// carrying a CL entry; they still answer as directories.
    pub fn is_directory(&self) -> bool {
        self.flags & FLAG_DIRECTORY != 0 || self.child_link().is_some()
    }

    /// A record is a symlink exactly when Rock Ridge gave it an SL entry.
    pub fn is_symlink(&self) -> bool {
        self.susp_entries
            .iter()
            .any(|e| matches!(e, SuspEntry::Sl { .. }))
    }

    /// Byte offset of this entry's data within the image.
    pub fn extent_offset(&self) -> usize {
        self.extent_lba as usize * SECTOR_SIZE
    }

    /// Whether the identifier is the current-directory or parent-directory
    /// sentinel (a single 0x00 or 0x01 byte).
    pub fn is_sentinel(&self) -> bool {
        self.identifier.len() == 1 && self.identifier[0] <= 1
    }

    /// Relocation marker: the record only truly exists at the position its
    /// parent's CL entry points to.
    pub fn is_relocation_stub(&self) -> bool {
        self.susp_entries.iter().any(|e| matches!(e, SuspEntry::Re))
    }

    /// CL target block, when this record is a placeholder for a relocated
    /// directory.
    pub fn child_link(&self) -> Option<u32> {
        self.susp_entries.iter().find_map(|e| match e {
            SuspEntry::Cl { lba } => Some(*lba),
            _ => None,
        })
    }

    pub fn posix_attributes(&self) -> Option<(u32, u32, u32, u32)> {
        self.susp_entries.iter().find_map(|e| match e {
            SuspEntry::Px { mode, links, uid, gid } => Some((*mode, *links, *uid, *gid)),
            _ => None,
        })
    }

    pub fn timestamps(&self) -> Option<&Timestamps> {
        self.susp_entries.iter().find_map(|e| match e {
            SuspEntry::Tf(stamps) => Some(stamps),
            _ => None,
        })
    }

    /// The name this record answers to.
    ///
    /// A Rock Ridge NM chain wins when present; otherwise the identifier is
    /// decoded with the volume's encoding and, for files, stripped of its
    /// ";N" version suffix (and a bare trailing dot before it).
    pub fn file_name(&self) -> String {
        if let Some(name) = self.rock_ridge_name() {
            return name;
        }
        let ident = decode(&self.identifier, self.encoding);
        if self.is_directory() {
            return ident;
        }
        match ident.find(';') {
            Some(sep) if ident[..sep].ends_with('.') => ident[..sep - 1].to_string(),
            Some(sep) => ident[..sep].to_string(),
            None => ident,
        }
    }

    /// Assemble the NM chain into an alternate name.
    ///
    /// Returns `None` when no NM entry exists, or when the first one flags
    /// the current/parent directory (those names come from the tree, not
    /// from the entry).
    fn rock_ridge_name(&self) -> Option<String> {
        let mut name = Vec::new();
        let mut seen = false;
        for entry in &self.susp_entries {
            let SuspEntry::Nm { flags, name: fragment } = entry else {
                continue;
            };
            if !seen && *flags & (name_flags::CURRENT | name_flags::PARENT) != 0 {
                return None;
            }
            seen = true;
            name.extend_from_slice(fragment);
            if *flags & name_flags::CONTINUE == 0 {
                break;
            }
        }
        seen.then(|| decode(&name, self.encoding))
    }

    /// Assemble the SL component chain into a symlink target path.
    pub fn symlink_target(&self) -> Option<String> {
        let mut target = String::new();
        let mut seen = false;
        let mut chaining = false;
        for entry in &self.susp_entries {
            let SuspEntry::Sl { continues, components } = entry else {
                continue;
            };
            if seen && !chaining {
                break;
            }
            seen = true;
            chaining = *continues;
            for component in components {
                append_sl_component(&mut target, component, self.encoding);
            }
        }
        if !seen {
            return None;
        }
        if target.len() > 1 && target.ends_with('/') {
            target.pop();
        }
        Some(target)
    }
}

fn append_sl_component(target: &mut String, component: &SlComponent, encoding: TextEncoding) {
    if component.flags & name_flags::CURRENT != 0 {
        target.push_str("./");
    } else if component.flags & name_flags::PARENT != 0 {
        target.push_str("../");
    } else if component.flags & name_flags::ROOT != 0 {
        target.push('/');
    } else {
        target.push_str(&decode(&component.content, encoding));
        if component.flags & name_flags::CONTINUE == 0 {
            target.push('/');
        }
    }
}
