//! ZIP archive reading.
//!
//! ## Architecture
//!
//! The module is organized into four components:
//!
//! - [`structures`]: Data structures representing ZIP format elements
//!   (EOCD, central directory records, local file headers)
//! - [`index`]: Locating the EOCD, walking the central directory, and
//!   building the path index
//! - [`data`]: Decoding a single file's bytes (STORED and DEFLATE)
//! - [`archive`]: The [`ZipFs`] filesystem facade
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! This implementation reads the EOCD first (from the end of the buffer),
//! then the Central Directory; local headers are only touched when a file's
//! content is actually requested.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - STORED (no compression) method
//! - DEFLATE compression method
//! - Code-page and UTF-8 file names (general-purpose flag bit 11)
//!
//! ## Limitations
//!
//! - No ZIP64 extensions (rejected as unsupported)
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod archive;
mod data;
mod index;
mod structures;

pub use archive::ZipFs;
pub use index::ZipIndex;
pub use structures::{CompressionMethod, EndOfCentralDirectory, FileEntry, LocalFileHeader};
