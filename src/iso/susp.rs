//! System Use Sharing Protocol (SUSP) and Rock Ridge entries.
//!
//! The system use area trailing each directory record identifier carries a
//! list of `{signature, length, version, payload}` entries. SUSP itself
//! defines SP/CE/ST; the Rock Ridge extension (identifier `IEEE_P1282`)
//! layers POSIX metadata on top: PX permissions, PN device numbers, TF
//! timestamps, NM long names, SL symlink targets, SF sparse files, and
//! CL/PL/RE directory relocation.
//!
//! Entries are decoded eagerly into a closed enum. Unknown signatures decode
//! to [`SuspEntry::Unknown`] and are carried along; they are never an error.

use log::warn;

use crate::error::{ArchiveError, Result};
use crate::reader::ByteReader;

/// Sector size shared by every ISO9660 structure.
pub const SECTOR_SIZE: usize = 2048;

/// CE entries can chain continuation areas; a malicious image could chain
/// them into a cycle, so recursion is capped.
const MAX_CONTINUATION_DEPTH: usize = 32;

/// Timestamp presence flags in a TF entry.
pub mod tf_flags {
    pub const CREATION: u8 = 1;
    pub const MODIFY: u8 = 1 << 1;
    pub const ACCESS: u8 = 1 << 2;
    pub const ATTRIBUTES: u8 = 1 << 3;
    pub const BACKUP: u8 = 1 << 4;
    pub const EXPIRATION: u8 = 1 << 5;
    pub const EFFECTIVE: u8 = 1 << 6;
    pub const LONG_FORM: u8 = 1 << 7;
}

/// Flags on NM entries and SL component records.
pub mod name_flags {
    pub const CONTINUE: u8 = 1;
    pub const CURRENT: u8 = 1 << 1;
    pub const PARENT: u8 = 1 << 2;
    pub const ROOT: u8 = 1 << 3;
}

/// One component of a symlink target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlComponent {
    pub flags: u8,
    pub content: Vec<u8>,
}

/// Decoded timestamps from a TF entry.
///
/// Each field is seconds since the Unix epoch, present only when the
/// corresponding flag bit was set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamps {
    pub creation: Option<i64>,
    pub modify: Option<i64>,
    pub access: Option<i64>,
    pub attributes: Option<i64>,
    pub backup: Option<i64>,
    pub expiration: Option<i64>,
    pub effective: Option<i64>,
}

/// A decoded system use entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuspEntry {
    /// SP: SUSP indicator, only valid as the first entry of the root's
    /// current-directory record. `skip` bytes are skipped at the start of
    /// every record's system use area.
    Sp { skip: u8 },
    /// ER: extension reference naming the extension in use.
    Er { identifier: Vec<u8> },
    /// RR: deprecated Rock Ridge presence marker.
    Rr,
    /// PX: POSIX file attributes.
    Px { mode: u32, links: u32, uid: u32, gid: u32 },
    /// TF: file timestamps.
    Tf(Timestamps),
    /// NM: alternate (long) file name fragment.
    Nm { flags: u8, name: Vec<u8> },
    /// SL: symlink target component records.
    Sl { continues: bool, components: Vec<SlComponent> },
    /// CL: child link, relocating an over-deep directory's contents.
    Cl { lba: u32 },
    /// PL: parent link inside a relocated directory, pointing back at the
    /// original parent.
    Pl { lba: u32 },
    /// RE: marks a record that exists only at its relocated position.
    Re,
    /// PN: device numbers for character and block special files.
    Pn { dev_high: u32, dev_low: u32 },
    /// SF: sparse file geometry.
    Sf { virtual_size_high: u32, virtual_size_low: u32, table_depth: u8 },
    /// Any signature this crate does not interpret.
    Unknown { signature: [u8; 2] },
}

/// Decode the system use entries in `data[start..start + len]`.
///
/// The final 4 bytes of the window are excluded; records round their system
/// use area up and those bytes never hold a complete entry. CE continuation
/// areas are spliced inline, so callers see one flat list.
pub fn decode_entries(data: &[u8], start: usize, len: usize) -> Result<Vec<SuspEntry>> {
    let mut entries = Vec::new();
    decode_into(data, start, len, 0, &mut entries)?;
    Ok(entries)
}

fn decode_into(
    data: &[u8],
    start: usize,
    len: usize,
    depth: usize,
    entries: &mut Vec<SuspEntry>,
) -> Result<()> {
    if depth > MAX_CONTINUATION_DEPTH {
        return Err(ArchiveError::Malformed(
            "continuation area chain is too deep".into(),
        ));
    }
    let window_end = (start + len).saturating_sub(4).min(data.len());
    let mut pos = start;
    while pos + 4 <= window_end {
        let signature = [data[pos], data[pos + 1]];
        let length = data[pos + 2] as usize;
        if length == 0 {
            // Padding reached; everything decoded so far stands.
            warn!("zero-length system use entry at offset {pos}");
            return Ok(());
        }
        match &signature {
            b"ST" => return Ok(()),
            b"CE" => {
                let (area_start, area_len) = continuation_window(data, pos)?;
                decode_into(data, area_start, area_len, depth + 1, entries)?;
            }
            _ => entries.push(decode_one(data, pos, length, signature)?),
        }
        pos += length;
    }
    Ok(())
}

/// CE payload: both-endian lba at +4, byte offset at +12, length at +20.
fn continuation_window(data: &[u8], pos: usize) -> Result<(usize, usize)> {
    let mut r = ByteReader::at(data, pos + 4)?;
    let lba = r.read_u32()?;
    r.skip(4)?;
    let offset = r.read_u32()?;
    r.skip(4)?;
    let length = r.read_u32()?;
    let start = lba as usize * SECTOR_SIZE + offset as usize;
    Ok((start, length as usize))
}

fn decode_one(data: &[u8], pos: usize, length: usize, signature: [u8; 2]) -> Result<SuspEntry> {
    let entry = match &signature {
        b"SP" => {
            let check = [byte(data, pos + 4)?, byte(data, pos + 5)?];
            if check != [0xBE, 0xEF] {
                return Err(ArchiveError::Format(
                    "SP entry has bad check bytes".into(),
                ));
            }
            SuspEntry::Sp { skip: byte(data, pos + 6)? }
        }
        b"ER" => {
            let id_len = byte(data, pos + 4)? as usize;
            let mut r = ByteReader::at(data, pos + 8)?;
            SuspEntry::Er { identifier: r.bytes(id_len)?.to_vec() }
        }
        b"RR" => SuspEntry::Rr,
        b"PX" => {
            // mode/links/uid/gid are both-endian pairs; read the LE half.
            let mut r = ByteReader::at(data, pos + 4)?;
            let mode = r.read_u32()?;
            r.skip(4)?;
            let links = r.read_u32()?;
            r.skip(4)?;
            let uid = r.read_u32()?;
            r.skip(4)?;
            let gid = r.read_u32()?;
            SuspEntry::Px { mode, links, uid, gid }
        }
        b"TF" => SuspEntry::Tf(decode_tf(data, pos, length)?),
        b"NM" => {
            let flags = byte(data, pos + 4)?;
            let mut r = ByteReader::at(data, pos + 5)?;
            let name = r.bytes(length.saturating_sub(5))?.to_vec();
            SuspEntry::Nm { flags, name }
        }
        b"SL" => decode_sl(data, pos, length)?,
        b"CL" => {
            let mut r = ByteReader::at(data, pos + 4)?;
            SuspEntry::Cl { lba: r.read_u32()? }
        }
        b"PL" => {
            let mut r = ByteReader::at(data, pos + 4)?;
            SuspEntry::Pl { lba: r.read_u32()? }
        }
        b"RE" => SuspEntry::Re,
        b"PN" => {
            // dev_t high and low halves, each a both-endian pair.
            let mut r = ByteReader::at(data, pos + 4)?;
            let dev_high = r.read_u32()?;
            r.skip(4)?;
            let dev_low = r.read_u32()?;
            SuspEntry::Pn { dev_high, dev_low }
        }
        b"SF" => {
            let mut r = ByteReader::at(data, pos + 4)?;
            let virtual_size_high = r.read_u32()?;
            r.skip(4)?;
            let virtual_size_low = r.read_u32()?;
            r.skip(4)?;
            let table_depth = byte(data, pos + 20)?;
            SuspEntry::Sf { virtual_size_high, virtual_size_low, table_depth }
        }
        _ => SuspEntry::Unknown { signature },
    };
    Ok(entry)
}

fn byte(data: &[u8], pos: usize) -> Result<u8> {
    data.get(pos).copied().ok_or_else(|| {
        ArchiveError::Malformed("system use entry extends past the buffer".into())
    })
}

/// TF payload: a flags byte, then one timestamp per set presence bit in bit
/// order. The `LONG_FORM` bit selects the 17-byte textual form for all of
/// them; otherwise each is the compact 7-byte form.
fn decode_tf(data: &[u8], pos: usize, length: usize) -> Result<Timestamps> {
    let flags = byte(data, pos + 4)?;
    let stride = if flags & tf_flags::LONG_FORM != 0 { 17 } else { 7 };
    let mut out = Timestamps::default();
    let mut offset = pos + 5;
    let end = pos + length;
    let bits = [
        tf_flags::CREATION,
        tf_flags::MODIFY,
        tf_flags::ACCESS,
        tf_flags::ATTRIBUTES,
        tf_flags::BACKUP,
        tf_flags::EXPIRATION,
        tf_flags::EFFECTIVE,
    ];
    for bit in bits {
        if flags & bit == 0 {
            continue;
        }
        if offset + stride > end {
            break;
        }
        let mut r = ByteReader::at(data, offset)?;
        let raw = r.bytes(stride)?;
        let stamp = if stride == 17 {
            long_timestamp_to_unix(raw)
        } else {
            short_timestamp_to_unix(raw)
        };
        match bit {
            tf_flags::CREATION => out.creation = stamp,
            tf_flags::MODIFY => out.modify = stamp,
            tf_flags::ACCESS => out.access = stamp,
            tf_flags::ATTRIBUTES => out.attributes = stamp,
            tf_flags::BACKUP => out.backup = stamp,
            tf_flags::EXPIRATION => out.expiration = stamp,
            _ => out.effective = stamp,
        }
        offset += stride;
    }
    Ok(out)
}

fn decode_sl(data: &[u8], pos: usize, length: usize) -> Result<SuspEntry> {
    let flags = byte(data, pos + 4)?;
    let mut components = Vec::new();
    let mut offset = pos + 5;
    let end = pos + length;
    while offset + 2 <= end {
        let comp_flags = byte(data, offset)?;
        let comp_len = byte(data, offset + 1)? as usize;
        let mut r = ByteReader::at(data, offset + 2)?;
        let content = r.bytes(comp_len)?.to_vec();
        components.push(SlComponent { flags: comp_flags, content });
        offset += 2 + comp_len;
    }
    Ok(SuspEntry::Sl {
        continues: flags & name_flags::CONTINUE != 0,
        components,
    })
}

/// 7-byte directory record / TF timestamp: offset-from-1900 year, then
/// month, day, hour, minute, second, and a timezone offset in 15-minute
/// steps from GMT.
pub fn short_timestamp_to_unix(raw: &[u8]) -> Option<i64> {
    if raw.len() < 7 {
        return None;
    }
    let year = 1900 + raw[0] as i32;
    let tz_quarter_hours = raw[6] as i8;
    civil_to_unix(year, raw[1], raw[2], raw[3], raw[4], raw[5])
        .map(|t| t - tz_quarter_hours as i64 * 15 * 60)
}

/// 17-byte textual timestamp: 16 ASCII digits (year through centiseconds)
/// and a trailing timezone byte.
pub fn long_timestamp_to_unix(raw: &[u8]) -> Option<i64> {
    if raw.len() < 17 {
        return None;
    }
    let digits = std::str::from_utf8(&raw[..16]).ok()?;
    let field = |range: std::ops::Range<usize>| digits.get(range)?.parse::<u32>().ok();
    let year = field(0..4)? as i32;
    let tz_quarter_hours = raw[16] as i8;
    civil_to_unix(
        year,
        field(4..6)? as u8,
        field(6..8)? as u8,
        field(8..10)? as u8,
        field(10..12)? as u8,
        field(12..14)? as u8,
    )
    .map(|t| t - tz_quarter_hours as i64 * 15 * 60)
}

fn civil_to_unix(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<i64> {
    let month = time::Month::try_from(month).ok()?;
    let date = time::Date::from_calendar_date(year, month, day).ok()?;
    let dt = date.with_hms(hour, minute, second.min(59)).ok()?;
    Some(dt.assume_utc().unix_timestamp())
}
