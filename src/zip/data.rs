//! File content extraction.
//!
//! The central directory entry locates the local file header; the header's
//! own variable-length fields locate the data. Sizes and the compression
//! method always come from the central directory entry, never from the local
//! header, whose copies may be stale or deferred to a data descriptor.

use std::io::Read;

use flate2::bufread::DeflateDecoder;
use log::debug;

use crate::error::{ArchiveError, Result};
use crate::zip::structures::{CompressionMethod, FileEntry, LocalFileHeader};

/// Decode one file's bytes from the archive buffer.
///
/// Output is freshly computed on every call; nothing is cached.
pub fn materialize(data: &[u8], entry: &FileEntry) -> Result<Vec<u8>> {
    if entry.is_encrypted() {
        return Err(ArchiveError::Unsupported(format!(
            "encrypted entry: {}",
            entry.name
        )));
    }

    let header_offset = entry.header_relative_offset as usize;
    let header = LocalFileHeader::parse(data, header_offset)?;
    let start = header_offset + header.total_size();
    let end = start
        .checked_add(entry.compressed_size as usize)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| {
            ArchiveError::Malformed(format!("data for {} extends past the archive", entry.name))
        })?;
    let compressed = &data[start..end];

    match entry.method {
        CompressionMethod::Stored => Ok(compressed.to_vec()),
        CompressionMethod::Deflate => inflate(compressed, entry),
        CompressionMethod::Unknown(_) => Err(ArchiveError::Unsupported(format!(
            "compression method {} for {}",
            entry.method.name(),
            entry.name
        ))),
    }
}

/// Raw inflate, bounded by the declared uncompressed size.
fn inflate(compressed: &[u8], entry: &FileEntry) -> Result<Vec<u8>> {
    debug!(
        "inflating {}: {} -> {} bytes",
        entry.name, entry.compressed_size, entry.uncompressed_size
    );
    let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
    let mut decoder = DeflateDecoder::new(compressed).take(entry.uncompressed_size as u64);
    decoder
        .read_to_end(&mut out)
        .map_err(|err| ArchiveError::Malformed(format!("bad deflate stream in {}: {err}", entry.name)))?;
    Ok(out)
}
