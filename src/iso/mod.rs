//! ISO9660 image reading, with Joliet and Rock Ridge support.
//!
//! ## Architecture
//!
//! - [`volume`]: scanning the descriptor set and choosing the tree to mount
//! - [`record`]: the 33-byte-plus directory record and its decoded fields
//! - [`susp`]: system use entries (SUSP) and the Rock Ridge extension
//! - [`directory`]: walking a directory extent into child records
//! - [`archive`]: the [`IsoFs`] filesystem facade
//!
//! ## ISO9660 Format Overview
//!
//! An image is a run of 2048-byte sectors. Sectors 0..16 are the system
//! area; the volume descriptor set starts at sector 16 and each descriptor
//! points at a root directory record. Directories are extents of packed
//! directory records; file records point at contiguous data extents, so
//! reading a file is a single slice of the image.
//!
//! ## Supported Features
//!
//! - Plain ISO9660 (ECMA-119) with code-page identifiers
//! - Joliet supplementary descriptors (UCS-2 identifiers)
//! - Rock Ridge: long names (NM), POSIX attributes (PX), timestamps (TF),
//!   symlinks (SL), and relocated directories (CL/RE)
//! - SUSP continuation areas (CE)
//!
//! ## Limitations
//!
//! - Interleaved files and extended attribute records are not interpreted
//! - Multi-extent files (several records per file) are not joined

mod archive;
mod directory;
mod record;
mod susp;
mod volume;

pub use archive::IsoFs;
pub use directory::Directory;
pub use record::DirectoryRecord;
pub use susp::{SECTOR_SIZE, SlComponent, SuspEntry, Timestamps, name_flags, tf_flags};
pub use volume::{VolumeDescriptor, VolumeKind, select_volume};
