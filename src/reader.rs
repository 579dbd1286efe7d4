//! Bounds-checked little-endian field decoding.
//!
//! Both archive formats are built from fixed-layout records: runs of 1/2/4/8
//! byte little-endian integers and fixed-length byte arrays at known offsets.
//! [`ByteReader`] is the one primitive they share — a cursor bound to a byte
//! range that refuses to read past the end of the buffer. A short buffer
//! yields [`ArchiveError::Malformed`] instead of a panic, which is what keeps
//! truncated and adversarial archives from crashing the process.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{ArchiveError, Result};

/// Little-endian cursor over an immutable byte buffer.
pub struct ByteReader<'a> {
    data: &'a [u8],
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at `offset` within `data`.
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self> {
        if offset > data.len() {
            return Err(truncated());
        }
        let mut cursor = Cursor::new(data);
        cursor.set_position(offset as u64);
        Ok(Self { data, cursor })
    }

    /// Current absolute position within the buffer.
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| truncated())
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.cursor.read_u16::<LittleEndian>().map_err(|_| truncated())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<LittleEndian>().map_err(|_| truncated())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.cursor.read_u64::<LittleEndian>().map_err(|_| truncated())
    }

    /// Borrow `len` bytes from the current position and advance past them.
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let start = self.position();
        let end = start.checked_add(len).ok_or_else(truncated)?;
        if end > self.data.len() {
            return Err(truncated());
        }
        self.cursor.set_position(end as u64);
        Ok(&self.data[start..end])
    }

    /// Skip `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes(len)?;
        Ok(())
    }
}

fn truncated() -> ArchiveError {
    ArchiveError::Malformed("record extends past the end of the buffer".into())
}

/// Read a little-endian u32 at an absolute offset without a cursor.
///
/// Used by backward scans that probe many candidate offsets.
pub fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    if end > data.len() {
        return None;
    }
    Some(u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]))
}
