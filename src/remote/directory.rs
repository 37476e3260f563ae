//! Local directory served through [`RemoteFs`]
//!
//! Lets a mounted share (or a test fixture) go through exactly the same
//! walk and transfer pipeline as an SFTP source.

use crate::error::{IoResultExt, Result};
use crate::remote::{RemoteDirEntry, RemoteFs, RemoteStat};
use std::fs::{File, Metadata};
use std::path::{Path, PathBuf};

/// Source tree read straight from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryRemote;

impl DirectoryRemote {
    /// Create a new local source
    pub fn new() -> Self {
        Self
    }
}

fn stat_from_metadata(metadata: &Metadata) -> RemoteStat {
    #[cfg(unix)]
    let mode = {
        use std::os::unix::fs::MetadataExt;
        metadata.mode()
    };

    #[cfg(not(unix))]
    let mode = if metadata.is_dir() {
        crate::remote::S_IFDIR | 0o755
    } else if metadata.is_file() {
        crate::remote::S_IFREG | 0o644
    } else {
        0
    };

    RemoteStat::from_mode(mode, metadata.len())
}

impl RemoteFs for DirectoryRemote {
    type Reader = File;

    fn stat(&self, path: &Path) -> Result<RemoteStat> {
        let metadata = std::fs::metadata(path).with_path(path)?;
        Ok(stat_from_metadata(&metadata))
    }

    fn open_read(&self, path: &Path) -> Result<File> {
        File::open(path).with_path(path)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<RemoteDirEntry>> {
        let mut entries = Vec::new();

        for entry in std::fs::read_dir(path).with_path(path)? {
            let entry = entry.with_path(path)?;
            let metadata = entry.metadata().with_path(entry.path())?;
            entries.push(RemoteDirEntry {
                name: PathBuf::from(entry.file_name()),
                stat: stat_from_metadata(&metadata),
            });
        }

        Ok(entries)
    }
}
