//! Volume descriptor scanning and selection.
//!
//! The descriptor set starts at sector 16, one descriptor per sector, and
//! runs until the set terminator. A Primary descriptor is always present;
//! a Joliet image adds a Supplementary descriptor whose directory tree
//! carries UCS-2 names. When both exist the Supplementary tree wins.

use log::debug;

use crate::error::{ArchiveError, Result};
use crate::iso::susp::SECTOR_SIZE;
use crate::text::{TextEncoding, decode};

const STANDARD_IDENTIFIER: &[u8; 5] = b"CD001";

const TYPE_BOOT: u8 = 0;
const TYPE_PRIMARY: u8 = 1;
const TYPE_SUPPLEMENTARY: u8 = 2;
const TYPE_TERMINATOR: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    Primary,
    /// A Supplementary descriptor with a Joliet escape sequence.
    Supplementary,
}

/// The volume descriptor a lookup tree is rooted in.
#[derive(Debug, Clone)]
pub struct VolumeDescriptor {
    pub kind: VolumeKind,
    /// Absolute byte offset of the descriptor within the image.
    pub offset: usize,
    /// Identifier encoding for every record in this descriptor's tree.
    pub encoding: TextEncoding,
    /// Volume label, trimmed of padding.
    pub label: String,
    pub version: u8,
    /// Declared logical block size. Addresses in this crate assume 2048;
    /// other sizes exist in the standard but not in practice.
    pub logical_block_size: u16,
}

impl VolumeDescriptor {
    /// Offset of the 34-byte root directory record within the image.
    pub fn root_record_offset(&self) -> usize {
        self.offset + 156
    }
}

/// Scan the descriptor set and pick the tree to mount.
pub fn select_volume(data: &[u8]) -> Result<VolumeDescriptor> {
    let mut best: Option<VolumeDescriptor> = None;
    let mut sector = 16;
    loop {
        let offset = sector * SECTOR_SIZE;
        if offset + SECTOR_SIZE > data.len() {
            break;
        }
        if &data[offset + 1..offset + 6] != STANDARD_IDENTIFIER {
            return Err(ArchiveError::Format(format!(
                "volume descriptor at sector {sector} lacks the CD001 identifier"
            )));
        }
        let descriptor_type = data[offset];
        if descriptor_type == TYPE_TERMINATOR {
            return best
                .ok_or_else(|| ArchiveError::Format("no usable volume descriptor found".into()));
        }
        let candidate = match descriptor_type {
            TYPE_PRIMARY => Some(describe(data, offset, VolumeKind::Primary)),
            TYPE_SUPPLEMENTARY => {
                require_joliet_escape(data, offset)?;
                Some(describe(data, offset, VolumeKind::Supplementary))
            }
            TYPE_BOOT => None,
            other => {
                debug!("skipping volume descriptor of type {other} at sector {sector}");
                None
            }
        };
        if let Some(candidate) = candidate {
            // A Supplementary tree, once found, is never displaced.
            let keep_current = matches!(
                best,
                Some(VolumeDescriptor { kind: VolumeKind::Supplementary, .. })
            );
            if !keep_current {
                best = Some(candidate);
            }
        }
        sector += 1;
    }
    // Ran off the end of the buffer without a set terminator.
    Err(ArchiveError::Format(
        "volume descriptor set has no terminator".into(),
    ))
}

fn describe(data: &[u8], offset: usize, kind: VolumeKind) -> VolumeDescriptor {
    let encoding = match kind {
        VolumeKind::Primary => TextEncoding::ExtendedAscii,
        VolumeKind::Supplementary => TextEncoding::Ucs2Be,
    };
    let logical_block_size = u16::from_le_bytes([data[offset + 128], data[offset + 129]]);
    VolumeDescriptor {
        kind,
        offset,
        encoding,
        label: read_label(data, offset, encoding),
        version: data[offset + 6],
        logical_block_size,
    }
}

/// The escape sequences field must announce Joliet (UCS-2 level 1 to 3).
fn require_joliet_escape(data: &[u8], offset: usize) -> Result<()> {
    let escape = &data[offset + 88..offset + 91];
    let level_ok = matches!(escape[2], 0x40 | 0x43 | 0x45);
    if escape[0] != 0x25 || escape[1] != 0x2F || !level_ok {
        return Err(ArchiveError::Format(format!(
            "supplementary volume descriptor has an unrecognized escape sequence: {escape:02x?}"
        )));
    }
    Ok(())
}

fn read_label(data: &[u8], offset: usize, encoding: TextEncoding) -> String {
    let raw = &data[offset + 40..offset + 72];
    decode(raw, encoding)
        .trim_end_matches([' ', '\0'])
        .to_string()
}
