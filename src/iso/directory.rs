//! Walking a directory extent into its child records.
//!
//! Listings are recomputed on every call. The walk is a pure function of
//! the image bytes, so repeated traversal always yields the same records
//! and nothing needs invalidation.

use log::warn;

use crate::error::Result;
use crate::iso::record::DirectoryRecord;
use crate::iso::susp::SECTOR_SIZE;
use crate::text::TextEncoding;

/// The child records of one directory, in on-disk order.
pub struct Directory {
    records: Vec<DirectoryRecord>,
}

impl Directory {
    /// Read the directory `record` points at.
    ///
    /// A record carrying a Rock Ridge CL entry is a placeholder: the real
    /// contents live at the CL target block, and the walk limit there comes
    /// from the relocated directory's own current-directory record.
    pub fn read(
        data: &[u8],
        record: &DirectoryRecord,
        encoding: TextEncoding,
        rock_ridge_skip: Option<u8>,
    ) -> Result<Self> {
        let (start, limit) = match record.child_link() {
            Some(lba) => {
                let start = lba as usize * SECTOR_SIZE;
                let dot = DirectoryRecord::parse(data, start, encoding, rock_ridge_skip)?;
                (start, start + dot.data_length as usize)
            }
            None => {
                let start = record.extent_offset();
                (start, start + record.data_length as usize)
            }
        };

        let mut records = Vec::new();
        let mut pos = start;
        while pos < limit.min(data.len()) {
            // Records never span sector boundaries; the tail of a sector is
            // zero-filled and skipped a byte at a time.
            if data[pos] == 0 {
                pos += 1;
                continue;
            }
            let record = match DirectoryRecord::parse(data, pos, encoding, rock_ridge_skip) {
                Ok(record) => record,
                Err(err) => {
                    warn!("directory walk stopped at offset {pos}: {err}");
                    break;
                }
            };
            pos += record.length as usize;
            if record.is_sentinel() || record.is_relocation_stub() {
                continue;
            }
            records.push(record);
        }
        Ok(Self { records })
    }

    /// Child names in on-disk order.
    pub fn names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.file_name()).collect()
    }

    /// Find a child by name.
    pub fn get(&self, name: &str) -> Option<&DirectoryRecord> {
        self.records.iter().find(|r| r.file_name() == name)
    }

    pub fn records(&self) -> &[DirectoryRecord] {
        &self.records
    }
}
