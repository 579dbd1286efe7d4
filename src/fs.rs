//! The capability contract archive readers expose.
//!
//! Every reader answers the same four questions over an immutable archive
//! buffer: does this path exist, is it a file or a directory, what are its
//! children, and what are its decoded bytes. [`ArchiveFs`] is that contract;
//! a mount/adapter layer composes implementations without knowing which
//! on-disk format backs them.
//!
//! Paths are absolute, '/'-separated, with no trailing slash (except the
//! root itself). [`normalize`] maps caller input into that form.

use crate::error::Result;

/// What kind of node a path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
}

/// `stat` result for a single archive path.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub kind: FileKind,
    /// Decoded size in bytes (0 for directories).
    pub size: u64,
    /// POSIX permission bits. Always masked with 0o555: these trees are
    /// read-only no matter what the archive claims.
    pub mode: u32,
    /// Modification time, seconds since the Unix epoch.
    pub mtime: i64,
    /// Access time, seconds since the Unix epoch.
    pub atime: i64,
    /// Creation/change time, seconds since the Unix epoch.
    pub ctime: i64,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }
}

/// Read-only filesystem view over an archive buffer.
///
/// All operations are synchronous pure computations; the archive bytes are
/// fully resident before construction and are never mutated.
pub trait ArchiveFs {
    /// Look up a path, following symlinks on the terminal component.
    fn stat(&self, path: &str) -> Result<Metadata>;

    /// Decode a file's content. Fails with `IsADirectory` on directories and
    /// `NotFound` on unknown paths. Output is never cached: repeated reads
    /// repeat the work, bounding memory use by design.
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// List a directory's direct children, in archive order.
    fn read_dir(&self, path: &str) -> Result<Vec<String>>;
}

/// Normalize a caller-supplied path to the canonical absolute form.
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    out.push('/');
    for part in path.split('/').filter(|p| !p.is_empty()) {
        if !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(part);
    }
    out
}

/// Split a normalized path into (parent, leaf). The root's parent is itself.
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("/", path),
    }
}

/// Join a (possibly relative) target against a base directory, resolving
/// '.' and '..' components. Used for symlink resolution: the target is
/// interpreted relative to the symlink's containing directory.
pub fn join_relative(base_dir: &str, target: &str) -> String {
    let mut parts: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|p| !p.is_empty()).collect()
    };
    for part in target.split('/').filter(|p| !p.is_empty()) {
        match part {
            "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    if parts.is_empty() {
        return "/".into();
    }
    let mut out = String::new();
    for part in parts {
        out.push('/');
        out.push_str(part);
    }
    out
}
