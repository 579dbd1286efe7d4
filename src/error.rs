//! Error taxonomy shared by the ZIP and ISO9660 readers.
//!
//! Every failure mode maps to exactly one variant:
//!
//! - [`ArchiveError::Format`]: a fixed magic signature was missing or wrong
//!   (EOCD, central directory record, local file header, volume descriptor,
//!   SUSP indicator). Fatal to the operation that hit it.
//! - [`ArchiveError::Unsupported`]: the archive uses a feature this crate
//!   does not implement (ZIP64, spanned disks, encryption, an unknown
//!   compression method). The message names the feature.
//! - [`ArchiveError::NotFound`] / [`ArchiveError::NotADirectory`] /
//!   [`ArchiveError::IsADirectory`]: path-level conditions surfaced through
//!   the [`ArchiveFs`](crate::fs::ArchiveFs) contract.
//! - [`ArchiveError::Permission`]: reserved for the absolute-path check; a
//!   well-formed ZIP never stores a name starting with '/'.
//! - [`ArchiveError::Malformed`]: a record was truncated or inconsistent in
//!   a way that forces the current parse to stop.
//!
//! "Rock Ridge absent" is not an error; detection returns `None`.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// Bad or missing magic signature.
    #[error("format error: {0}")]
    Format(String),

    /// The archive needs a feature this crate does not support.
    #[error("unsupported feature: {0}")]
    Unsupported(String),

    /// The path has no entry in the archive.
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// A directory operation was attempted on a file.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A file operation was attempted on a directory.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// The archive contains something a well-formed archive never produces.
    #[error("permission denied: {0}")]
    Permission(String),

    /// A record was truncated or internally inconsistent.
    #[error("malformed input: {0}")]
    Malformed(String),
}
