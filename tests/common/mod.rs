//! In-memory archive builders for the integration tests.
//!
//! Both builders produce byte-exact archives small enough to eyeball in a
//! hex dump: a minimal but standards-shaped ZIP writer, and an ISO9660
//! image writer that can emit Primary, Joliet, and Rock Ridge trees.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;

use flate2::{Compression, Crc, write::DeflateEncoder};

pub const SECTOR_SIZE: usize = 2048;

// ---------------------------------------------------------------------------
// ZIP
// ---------------------------------------------------------------------------

struct ZipEntrySpec {
    name: String,
    data: Vec<u8>,
    deflate: bool,
    dir: bool,
    method_override: Option<u16>,
    utf8: bool,
    encrypted: bool,
}

pub struct ZipBuilder {
    entries: Vec<ZipEntrySpec>,
    comment: Vec<u8>,
    eocd_disk_number: u16,
    zip64_cd_offset: bool,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            comment: Vec::new(),
            eocd_disk_number: 0,
            zip64_cd_offset: false,
        }
    }

    fn push(mut self, spec: ZipEntrySpec) -> Self {
        self.entries.push(spec);
        self
    }

    /// A STORED file entry.
    pub fn file(self, name: &str, data: &[u8]) -> Self {
        self.push(ZipEntrySpec {
            name: name.into(),
            data: data.to_vec(),
            deflate: false,
            dir: false,
            method_override: None,
            utf8: false,
            encrypted: false,
        })
    }

    /// A DEFLATE file entry.
    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.push(ZipEntrySpec {
            name: name.into(),
            data: data.to_vec(),
            deflate: true,
            dir: false,
            method_override: None,
            utf8: false,
            encrypted: false,
        })
    }

    /// A UTF-8 flagged STORED file entry.
    pub fn utf8_file(self, name: &str, data: &[u8]) -> Self {
        self.push(ZipEntrySpec {
            name: name.into(),
            data: data.to_vec(),
            deflate: false,
            dir: false,
            method_override: None,
            utf8: true,
            encrypted: false,
        })
    }

    /// An explicit directory entry (trailing slash, DOS directory bit).
    pub fn dir(self, name: &str) -> Self {
        let name = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{name}/")
        };
        self.push(ZipEntrySpec {
            name,
            data: Vec::new(),
            deflate: false,
            dir: true,
            method_override: None,
            utf8: false,
            encrypted: false,
        })
    }

    /// A STORED entry whose recorded method code is overridden.
    pub fn with_method_code(self, name: &str, data: &[u8], code: u16) -> Self {
        self.push(ZipEntrySpec {
            name: name.into(),
            data: data.to_vec(),
            deflate: false,
            dir: false,
            method_override: Some(code),
            utf8: false,
            encrypted: false,
        })
    }

    /// An entry with the encryption flag bit set.
    pub fn encrypted(self, name: &str, data: &[u8]) -> Self {
        self.push(ZipEntrySpec {
            name: name.into(),
            data: data.to_vec(),
            deflate: false,
            dir: false,
            method_override: None,
            utf8: false,
            encrypted: true,
        })
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Record a disk number mismatch, making the archive look spanned.
    pub fn spanned(mut self) -> Self {
        self.eocd_disk_number = 1;
        self
    }

    /// Record the ZIP64 sentinel as the central directory offset.
    pub fn zip64(mut self) -> Self {
        self.zip64_cd_offset = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        // 2024-06-15 12:30:10
        let dos_date: u16 = ((2024 - 1980) << 9) | (6 << 5) | 15;
        let dos_time: u16 = (12 << 11) | (30 << 5) | 5;

        let mut out = Vec::new();
        let mut central = Vec::new();
        for spec in &self.entries {
            let payload = if spec.deflate {
                deflate(&spec.data)
            } else {
                spec.data.clone()
            };
            let method = spec
                .method_override
                .unwrap_or(if spec.deflate { 8 } else { 0 });
            let crc = crc32(&spec.data);
            let flags: u16 = (spec.encrypted as u16) | ((spec.utf8 as u16) << 11);
            let name = spec.name.as_bytes();
            let offset = out.len() as u32;

            out.extend_from_slice(&0x04034b50u32.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&flags.to_le_bytes());
            out.extend_from_slice(&method.to_le_bytes());
            out.extend_from_slice(&dos_time.to_le_bytes());
            out.extend_from_slice(&dos_date.to_le_bytes());
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&(spec.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(name);
            out.extend_from_slice(&payload);

            central.extend_from_slice(&0x02014b50u32.to_le_bytes());
            central.push(20); // zip version
            central.push(0); // host system
            central.extend_from_slice(&20u16.to_le_bytes());
            central.extend_from_slice(&flags.to_le_bytes());
            central.extend_from_slice(&method.to_le_bytes());
            central.extend_from_slice(&dos_time.to_le_bytes());
            central.extend_from_slice(&dos_date.to_le_bytes());
            central.extend_from_slice(&crc.to_le_bytes());
            central.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            central.extend_from_slice(&(spec.data.len() as u32).to_le_bytes());
            central.extend_from_slice(&(name.len() as u16).to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes()); // extra
            central.extend_from_slice(&0u16.to_le_bytes()); // comment
            central.extend_from_slice(&0u16.to_le_bytes()); // disk start
            central.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            let external: u32 = if spec.dir { 16 } else { 0 };
            central.extend_from_slice(&external.to_le_bytes());
            central.extend_from_slice(&offset.to_le_bytes());
            central.extend_from_slice(name);
        }

        let cd_offset = if self.zip64_cd_offset {
            0xFFFFFFFFu32
        } else {
            out.len() as u32
        };
        let cd_size = central.len() as u32;
        let count = self.entries.len() as u16;
        out.extend_from_slice(&central);
        out.extend_from_slice(&0x06054b50u32.to_le_bytes());
        out.extend_from_slice(&self.eocd_disk_number.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);
        out
    }
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}

// ---------------------------------------------------------------------------
// ISO9660
// ---------------------------------------------------------------------------

pub enum IsoNode {
    File {
        name: String,
        identifier: Vec<u8>,
        susp: Vec<u8>,
        data: Vec<u8>,
    },
    Dir {
        name: String,
        identifier: Vec<u8>,
        susp: Vec<u8>,
        children: Vec<IsoNode>,
    },
    /// A file-flagged placeholder carrying a CL entry, plus the relocated
    /// directory contents it points at.
    ClStub {
        identifier: Vec<u8>,
        susp: Vec<u8>,
        children: Vec<IsoNode>,
    },
}

/// A plain file: uppercase identifier with a ";1" version suffix.
pub fn iso_file(name: &str, data: &[u8]) -> IsoNode {
    IsoNode::File {
        name: name.into(),
        identifier: format!("{};1", name.to_uppercase()).into_bytes(),
        susp: Vec::new(),
        data: data.to_vec(),
    }
}

pub fn iso_dir(name: &str, children: Vec<IsoNode>) -> IsoNode {
    IsoNode::Dir {
        name: name.into(),
        identifier: name.to_uppercase().into_bytes(),
        susp: Vec::new(),
        children,
    }
}

/// A file whose Rock Ridge NM entry restores the real name.
pub fn rr_file(name: &str, data: &[u8]) -> IsoNode {
    IsoNode::File {
        name: name.into(),
        identifier: format!("{};1", name.to_uppercase()).into_bytes(),
        susp: susp_nm(name),
        data: data.to_vec(),
    }
}

pub fn rr_dir(name: &str, children: Vec<IsoNode>) -> IsoNode {
    IsoNode::Dir {
        name: name.into(),
        identifier: name.to_uppercase().into_bytes(),
        susp: susp_nm(name),
        children,
    }
}

/// A Rock Ridge symlink. `components` are (flags, content) pairs for the
/// SL component records.
pub fn rr_symlink(name: &str, components: &[(u8, &[u8])]) -> IsoNode {
    let mut susp = susp_nm(name);
    susp.extend_from_slice(&susp_sl(components));
    IsoNode::File {
        name: name.into(),
        identifier: format!("{};1", name.to_uppercase()).into_bytes(),
        susp,
        data: Vec::new(),
    }
}

/// Append extra raw system use bytes to a node's record.
pub fn with_susp(node: IsoNode, extra: &[u8]) -> IsoNode {
    match node {
        IsoNode::File { name, identifier, mut susp, data } => {
            susp.extend_from_slice(extra);
            IsoNode::File { name, identifier, susp, data }
        }
        IsoNode::Dir { name, identifier, mut susp, children } => {
            susp.extend_from_slice(extra);
            IsoNode::Dir { name, identifier, susp, children }
        }
        IsoNode::ClStub { identifier, mut susp, children } => {
            susp.extend_from_slice(extra);
            IsoNode::ClStub { identifier, susp, children }
        }
    }
}

pub fn susp_raw(sig: &[u8; 2], payload: &[u8]) -> Vec<u8> {
    let mut out = vec![sig[0], sig[1], (payload.len() + 4) as u8, 1];
    out.extend_from_slice(payload);
    out
}

pub fn susp_nm(name: &str) -> Vec<u8> {
    let mut payload = vec![0u8];
    payload.extend_from_slice(name.as_bytes());
    susp_raw(b"NM", &payload)
}

pub fn susp_px(mode: u32, uid: u32, gid: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    for value in [mode, 1, uid, gid] {
        payload.extend_from_slice(&value.to_le_bytes());
        payload.extend_from_slice(&value.to_be_bytes());
    }
    susp_raw(b"PX", &payload)
}

/// A TF entry carrying only a MODIFY timestamp in the 7-byte form.
pub fn susp_tf_modify(stamp: [u8; 7]) -> Vec<u8> {
    let mut payload = vec![1u8 << 1];
    payload.extend_from_slice(&stamp);
    susp_raw(b"TF", &payload)
}

pub fn susp_sl(components: &[(u8, &[u8])]) -> Vec<u8> {
    let mut payload = vec![0u8];
    for (flags, content) in components {
        payload.push(*flags);
        payload.push(content.len() as u8);
        payload.extend_from_slice(content);
    }
    susp_raw(b"SL", &payload)
}

pub fn susp_re() -> Vec<u8> {
    susp_raw(b"RE", &[])
}

pub struct IsoBuilder {
    label: String,
    joliet: bool,
    rock_ridge: bool,
    nodes: Vec<IsoNode>,
}

struct FlatNode {
    parent: usize,
    name: String,
    identifier: Vec<u8>,
    susp: Vec<u8>,
    kind: FlatKind,
}

enum FlatKind {
    File { data: Vec<u8> },
    Dir { children: Vec<usize> },
    ClStub { target: usize },
}

impl IsoBuilder {
    pub fn new() -> Self {
        Self {
            label: "TESTVOL".into(),
            joliet: false,
            rock_ridge: false,
            nodes: Vec::new(),
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.into();
        self
    }

    pub fn joliet(mut self) -> Self {
        self.joliet = true;
        self
    }

    pub fn rock_ridge(mut self) -> Self {
        self.rock_ridge = true;
        self
    }

    pub fn node(mut self, node: IsoNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn file(self, name: &str, data: &[u8]) -> Self {
        self.node(iso_file(name, data))
    }

    pub fn build(self) -> Vec<u8> {
        let mut flat = vec![FlatNode {
            parent: 0,
            name: String::new(),
            identifier: Vec::new(),
            susp: Vec::new(),
            kind: FlatKind::Dir { children: Vec::new() },
        }];
        let root_children: Vec<usize> = self
            .nodes
            .into_iter()
            .map(|node| flatten(&mut flat, 0, node))
            .collect();
        let FlatKind::Dir { children } = &mut flat[0].kind else {
            unreachable!();
        };
        *children = root_children;

        // Sector plan: descriptors, then primary directory extents, then
        // (for Joliet) a second set of directory extents, then file data.
        let descriptor_count = if self.joliet { 2 } else { 1 };
        let mut next_lba = 16 + descriptor_count + 1;
        let mut primary_dirs: HashMap<usize, u32> = HashMap::new();
        let mut joliet_dirs: HashMap<usize, u32> = HashMap::new();
        let mut file_extents: HashMap<usize, u32> = HashMap::new();
        for (id, node) in flat.iter().enumerate() {
            if matches!(node.kind, FlatKind::Dir { .. }) {
                primary_dirs.insert(id, next_lba as u32);
                next_lba += 1;
            }
        }
        if self.joliet {
            for (id, node) in flat.iter().enumerate() {
                if matches!(node.kind, FlatKind::Dir { .. }) {
                    joliet_dirs.insert(id, next_lba as u32);
                    next_lba += 1;
                }
            }
        }
        for (id, node) in flat.iter().enumerate() {
            if let FlatKind::File { data } = &node.kind {
                file_extents.insert(id, next_lba as u32);
                next_lba += data.len().div_ceil(SECTOR_SIZE).max(1);
            }
        }

        let mut image = vec![0u8; next_lba * SECTOR_SIZE];
        write_descriptor(
            &mut image,
            16,
            1,
            &ascii_label(&self.label),
            primary_dirs[&0],
        );
        if self.joliet {
            write_descriptor(&mut image, 17, 2, &ucs2_label(&self.label), joliet_dirs[&0]);
            let escape_offset = 17 * SECTOR_SIZE + 88;
            image[escape_offset..escape_offset + 3].copy_from_slice(&[0x25, 0x2F, 0x45]);
        }
        let term_offset = (16 + descriptor_count) * SECTOR_SIZE;
        image[term_offset] = 255;
        image[term_offset + 1..term_offset + 6].copy_from_slice(b"CD001");
        image[term_offset + 6] = 1;

        for (&id, _) in &primary_dirs {
            write_dir_extent(
                &mut image,
                &flat,
                id,
                &primary_dirs,
                &file_extents,
                false,
                self.rock_ridge,
            );
        }
        for (&id, _) in &joliet_dirs {
            write_dir_extent(&mut image, &flat, id, &joliet_dirs, &file_extents, true, false);
        }
        for (&id, &lba) in &file_extents {
            let FlatKind::File { data } = &flat[id].kind else {
                continue;
            };
            let offset = lba as usize * SECTOR_SIZE;
            image[offset..offset + data.len()].copy_from_slice(data);
        }
        image
    }
}

fn flatten(flat: &mut Vec<FlatNode>, parent: usize, node: IsoNode) -> usize {
    match node {
        IsoNode::File { name, identifier, susp, data } => {
            flat.push(FlatNode {
                parent,
                name,
                identifier,
                susp,
                kind: FlatKind::File { data },
            });
            flat.len() - 1
        }
        IsoNode::Dir { name, identifier, susp, children } => {
            flat.push(FlatNode {
                parent,
                name,
                identifier,
                susp,
                kind: FlatKind::Dir { children: Vec::new() },
            });
            let id = flat.len() - 1;
            let child_ids: Vec<usize> = children
                .into_iter()
                .map(|child| flatten(flat, id, child))
                .collect();
            let FlatKind::Dir { children } = &mut flat[id].kind else {
                unreachable!();
            };
            *children = child_ids;
            id
        }
        IsoNode::ClStub { identifier, susp, children } => {
            let target = flatten(
                flat,
                parent,
                IsoNode::Dir {
                    name: String::new(),
                    identifier: Vec::new(),
                    susp: Vec::new(),
                    children,
                },
            );
            flat.push(FlatNode {
                parent,
                name: String::new(),
                identifier,
                susp,
                kind: FlatKind::ClStub { target },
            });
            flat.len() - 1
        }
    }
}

/// Serialize one directory record. The system use area, when non-empty, is
/// padded with four zero bytes so the trailing-window rule never clips a
/// real entry.
fn raw_record(identifier: &[u8], lba: u32, data_len: u32, flags: u8, susp: &[u8]) -> Vec<u8> {
    let padded_susp: Vec<u8> = if susp.is_empty() {
        Vec::new()
    } else {
        let mut v = susp.to_vec();
        v.extend_from_slice(&[0, 0, 0, 0]);
        v
    };
    let pad = (33 + identifier.len()) % 2;
    let length = 33 + identifier.len() + pad + padded_susp.len();
    assert!(length <= 255, "directory record too long");
    let mut out = vec![0u8; 33];
    out[0] = length as u8;
    out[2..6].copy_from_slice(&lba.to_le_bytes());
    out[6..10].copy_from_slice(&lba.to_be_bytes());
    out[10..14].copy_from_slice(&data_len.to_le_bytes());
    out[14..18].copy_from_slice(&data_len.to_be_bytes());
    // 2020-06-15 12:00:00 UTC
    out[18..25].copy_from_slice(&[120, 6, 15, 12, 0, 0, 0]);
    out[25] = flags;
    out[28..30].copy_from_slice(&1u16.to_le_bytes());
    out[30..32].copy_from_slice(&1u16.to_be_bytes());
    out[32] = identifier.len() as u8;
    out.extend_from_slice(identifier);
    out.extend(std::iter::repeat_n(0, pad));
    out.extend_from_slice(&padded_susp);
    out
}

fn write_descriptor(image: &mut [u8], sector: usize, kind: u8, label: &[u8], root_lba: u32) {
    let base = sector * SECTOR_SIZE;
    image[base] = kind;
    image[base + 1..base + 6].copy_from_slice(b"CD001");
    image[base + 6] = 1;
    image[base + 128..base + 130].copy_from_slice(&2048u16.to_le_bytes());
    image[base + 130..base + 132].copy_from_slice(&2048u16.to_be_bytes());
    image[base + 40..base + 40 + label.len().min(32)]
        .copy_from_slice(&label[..label.len().min(32)]);
    let root = raw_record(&[0], root_lba, SECTOR_SIZE as u32, 2, &[]);
    image[base + 156..base + 156 + root.len()].copy_from_slice(&root);
}

fn write_dir_extent(
    image: &mut [u8],
    flat: &[FlatNode],
    id: usize,
    dirs: &HashMap<usize, u32>,
    files: &HashMap<usize, u32>,
    joliet: bool,
    rock_ridge_root: bool,
) {
    let FlatKind::Dir { children } = &flat[id].kind else {
        return;
    };
    let self_lba = dirs[&id];
    let parent_lba = dirs.get(&flat[id].parent).copied().unwrap_or(self_lba);

    let mut buf = Vec::new();
    let dot_susp = if rock_ridge_root && id == 0 {
        let mut susp = susp_raw(b"SP", &[0xBE, 0xEF, 0]);
        let mut er_payload = vec![10u8, 0, 0, 1];
        er_payload.extend_from_slice(b"IEEE_P1282");
        susp.extend_from_slice(&susp_raw(b"ER", &er_payload));
        susp
    } else {
        Vec::new()
    };
    buf.extend_from_slice(&raw_record(&[0], self_lba, SECTOR_SIZE as u32, 2, &dot_susp));
    buf.extend_from_slice(&raw_record(&[1], parent_lba, SECTOR_SIZE as u32, 2, &[]));

    for &child_id in children {
        let child = &flat[child_id];
        let identifier = if joliet {
            ucs2_identifier(&child.name)
        } else {
            child.identifier.clone()
        };
        let susp = if joliet { &[] as &[u8] } else { &child.susp };
        let record = match &child.kind {
            FlatKind::File { data } => raw_record(
                &identifier,
                files[&child_id],
                data.len() as u32,
                0,
                susp,
            ),
            FlatKind::Dir { .. } => {
                raw_record(&identifier, dirs[&child_id], SECTOR_SIZE as u32, 2, susp)
            }
            FlatKind::ClStub { target } => {
                let mut cl_payload = Vec::new();
                cl_payload.extend_from_slice(&dirs[target].to_le_bytes());
                cl_payload.extend_from_slice(&dirs[target].to_be_bytes());
                let mut stub_susp = susp_raw(b"CL", &cl_payload);
                stub_susp.extend_from_slice(susp);
                raw_record(&identifier, 0, 0, 0, &stub_susp)
            }
        };
        buf.extend_from_slice(&record);
    }

    assert!(buf.len() <= SECTOR_SIZE, "directory extent overflow");
    let offset = self_lba as usize * SECTOR_SIZE;
    image[offset..offset + buf.len()].copy_from_slice(&buf);
}

fn ascii_label(label: &str) -> Vec<u8> {
    let mut out = label.as_bytes().to_vec();
    out.resize(32, b' ');
    out
}

fn ucs2_label(label: &str) -> Vec<u8> {
    let mut out = ucs2_identifier(label);
    while out.len() < 32 {
        out.push(0);
        out.push(b' ');
    }
    out.truncate(32);
    out
}

fn ucs2_identifier(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len() * 2);
    for unit in name.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}
