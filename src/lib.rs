//! # arcfs
//!
//! Read-only filesystem views over archives held in memory.
//!
//! Two on-disk formats are supported behind one interface: ZIP archives
//! (STORED and DEFLATE entries, code-page or UTF-8 names) and ISO9660
//! images (plain ECMA-119, Joliet, and Rock Ridge). The archive buffer is
//! borrowed, never copied or mutated; every operation is a pure computation
//! over it, so readers are cheap to construct and safe to share.
//!
//! ## Example
//!
//! ```no_run
//! use arcfs::{ArchiveFs, ZipFs};
//!
//! fn main() -> anyhow::Result<()> {
//!     let data = std::fs::read("archive.zip")?;
//!     let fs = ZipFs::new(&data)?;
//!
//!     for name in fs.read_dir("/")? {
//!         println!("{name}");
//!     }
//!     let bytes = fs.read_file("/readme.txt")?;
//!     println!("{}", String::from_utf8_lossy(&bytes));
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod fs;
pub mod iso;
pub mod reader;
pub mod text;
pub mod zip;

pub use cli::Cli;
pub use error::{ArchiveError, Result};
pub use fs::{ArchiveFs, FileKind, Metadata};
pub use iso::{IsoFs, SECTOR_SIZE};
pub use zip::{CompressionMethod, FileEntry, ZipFs};
