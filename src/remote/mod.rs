//! Remote file access
//!
//! The walker and scheduler read the source tree only through
//! [`RemoteFs`]. Two backends implement it:
//!
//! - [`SshConnection`](crate::network::SshConnection): an authenticated SFTP session
//! - [`DirectoryRemote`]: a local directory served as if it were remote

mod directory;
mod sftp;

pub use directory::*;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// File type bits mask
pub const S_IFMT: u32 = 0o170_000;
/// Directory type bits
pub const S_IFDIR: u32 = 0o040_000;
/// Regular file type bits
pub const S_IFREG: u32 = 0o100_000;

/// Classification of a remote entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Directory
    Directory,
    /// Regular file
    RegularFile,
    /// Symlink, device, socket, fifo...
    Other,
}

impl EntryKind {
    /// Classify raw `st_mode` bits
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFDIR => Self::Directory,
            S_IFREG => Self::RegularFile,
            _ => Self::Other,
        }
    }

    /// Short label for reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Directory => "dir",
            Self::RegularFile => "file",
            Self::Other => "other",
        }
    }
}

/// Remote metadata relevant to a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStat {
    /// Entry type
    pub kind: EntryKind,
    /// Size in bytes
    pub size: u64,
    /// Permission bits (`0o7777` mask)
    pub permissions: u32,
}

impl RemoteStat {
    /// Build from raw `st_mode` bits and a size
    pub fn from_mode(mode: u32, size: u64) -> Self {
        Self {
            kind: EntryKind::from_mode(mode),
            size,
            permissions: mode & 0o7777,
        }
    }
}

/// One child returned by [`RemoteFs::list_dir`]
#[derive(Debug, Clone)]
pub struct RemoteDirEntry {
    /// Entry name within its parent
    pub name: PathBuf,
    /// Entry metadata (not following symlinks)
    pub stat: RemoteStat,
}

/// Read-only access to the source tree
pub trait RemoteFs: Send + Sync {
    /// Read handle returned by [`RemoteFs::open_read`]
    type Reader: Read;

    /// Stat a path, following symlinks
    fn stat(&self, path: &Path) -> Result<RemoteStat>;

    /// Open a file for streaming reads
    fn open_read(&self, path: &Path) -> Result<Self::Reader>;

    /// List a directory's children, excluding `.` and `..`
    fn list_dir(&self, path: &Path) -> Result<Vec<RemoteDirEntry>>;
}

impl<T: RemoteFs + ?Sized> RemoteFs for &T {
    type Reader = T::Reader;

    fn stat(&self, path: &Path) -> Result<RemoteStat> {
        (**self).stat(path)
    }

    fn open_read(&self, path: &Path) -> Result<Self::Reader> {
        (**self).open_read(path)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<RemoteDirEntry>> {
        (**self).list_dir(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_mode() {
        assert_eq!(EntryKind::from_mode(0o040_755), EntryKind::Directory);
        assert_eq!(EntryKind::from_mode(0o100_644), EntryKind::RegularFile);
        assert_eq!(EntryKind::from_mode(0o120_777), EntryKind::Other);
        assert_eq!(EntryKind::from_mode(0o020_620), EntryKind::Other);
        assert_eq!(EntryKind::from_mode(0), EntryKind::Other);
    }

    #[test]
    fn test_stat_keeps_permission_bits() {
        let stat = RemoteStat::from_mode(0o104_755, 10);
        assert_eq!(stat.kind, EntryKind::RegularFile);
        assert_eq!(stat.permissions, 0o4755);
        assert_eq!(stat.size, 10);
    }
}
