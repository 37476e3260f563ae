//! Buffered stream copy
//!
//! Streams a remote read handle into a freshly created local file through
//! a pooled buffer, then forces the data to disk. Existing destinations
//! are left alone so repeated runs only fetch what is missing.

use crate::error::{IoResultExt, OwlError, Result};
use crate::fs::{BufferPool, LocalFs};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// What a single file copy did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// File written and synced
    Copied(u64),
    /// Destination file already existed
    Skipped,
}

impl CopyOutcome {
    /// Bytes written (0 when skipped)
    pub fn bytes(&self) -> u64 {
        match self {
            Self::Copied(bytes) => *bytes,
            Self::Skipped => 0,
        }
    }
}

/// Copies source streams into new local files
#[derive(Clone)]
pub struct StreamCopier {
    pool: Arc<BufferPool>,
}

impl StreamCopier {
    /// Create a copier drawing buffers from `pool`
    pub fn new(pool: Arc<BufferPool>) -> Self {
        Self { pool }
    }

    /// Buffer pool in use
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Copy `source` into a new file at `dest` with permission bits `mode`.
    ///
    /// Returns [`CopyOutcome::Skipped`] without reading the source when
    /// `dest` is already a regular file. Anything else in the way (a
    /// directory, a symlink) is an error. A failure after creation leaves
    /// the partial file behind; the next run will skip it, so callers
    /// report the error.
    pub fn copy<R, L>(&self, local: &L, source: &mut R, dest: &Path, mode: u32) -> Result<CopyOutcome>
    where
        R: Read + ?Sized,
        L: LocalFs,
    {
        let mut buffer = self.pool.acquire();

        let mut file = match local.create_exclusive(dest, mode) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !is_regular_file(dest) {
                    return Err(OwlError::InvalidPath(format!(
                        "{} exists and is not a regular file",
                        dest.display()
                    )));
                }
                tracing::debug!("{} already exists, skipping", dest.display());
                return Ok(CopyOutcome::Skipped);
            }
            Err(e) => return Err(e).with_path(dest),
        };

        let mut written = 0u64;
        loop {
            let bytes_read = match source.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(OwlError::ReadFailed {
                        path: dest.to_path_buf(),
                        source: e,
                    })
                }
            };

            file.write_all(&buffer[..bytes_read]).with_path(dest)?;
            written += bytes_read as u64;
        }

        local.sync(&mut file).map_err(|e| OwlError::FlushFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        Ok(CopyOutcome::Copied(written))
    }
}

/// Regular file, not following symlinks
fn is_regular_file(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BUFFER_SIZE;
    use crate::fs::StdFs;
    use std::io::{self, Cursor};
    use tempfile::TempDir;

    fn copier() -> StreamCopier {
        StreamCopier::new(Arc::new(BufferPool::new(DEFAULT_BUFFER_SIZE, 2)))
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn test_byte_exact_copies() {
        let dir = TempDir::new().unwrap();
        let copier = copier();

        for len in [0, 1, 32 * 1024, 32 * 1024 + 1, 10 * 1024 * 1024] {
            let data = pattern(len);
            let dest = dir.path().join(format!("file_{}", len));

            let outcome = copier
                .copy(&StdFs, &mut Cursor::new(&data), &dest, 0o644)
                .unwrap();

            assert_eq!(outcome, CopyOutcome::Copied(len as u64));
            assert_eq!(std::fs::read(&dest).unwrap(), data);
        }

        assert_eq!(copier.pool().stats().in_use, 0);
    }

    #[test]
    fn test_existing_destination_is_skipped() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("kept.txt");
        std::fs::write(&dest, b"original").unwrap();

        let outcome = copier()
            .copy(&StdFs, &mut Cursor::new(b"replacement"), &dest, 0o644)
            .unwrap();

        assert_eq!(outcome, CopyOutcome::Skipped);
        assert_eq!(outcome.bytes(), 0);
        assert_eq!(std::fs::read(&dest).unwrap(), b"original");
    }

    #[test]
    fn test_directory_in_the_way_is_an_error() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a.txt");
        std::fs::create_dir(&dest).unwrap();
        let copier = copier();

        let err = copier
            .copy(&StdFs, &mut Cursor::new(b"data"), &dest, 0o644)
            .unwrap_err();

        assert!(matches!(err, OwlError::InvalidPath(_)));
        assert!(dest.is_dir());
        assert_eq!(std::fs::read_dir(&dest).unwrap().count(), 0);
        assert_eq!(copier.pool().stats().in_use, 0);
    }

    #[test]
    fn test_symlink_in_the_way_is_an_error() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.txt");
        std::fs::write(&target, b"elsewhere").unwrap();
        let dest = dir.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &dest).unwrap();

        let err = copier()
            .copy(&StdFs, &mut Cursor::new(b"data"), &dest, 0o644)
            .unwrap_err();

        assert!(matches!(err, OwlError::InvalidPath(_)));
        assert_eq!(std::fs::read(&target).unwrap(), b"elsewhere");
    }

    #[test]
    fn test_missing_parent_is_an_error() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nope/file.txt");

        let err = copier()
            .copy(&StdFs, &mut Cursor::new(b"data"), &dest, 0o644)
            .unwrap_err();
        assert!(matches!(err, OwlError::NotFound(_)));
    }

    /// Yields some bytes, then fails
    struct BrokenReader {
        remaining: usize,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "channel closed"));
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(7);
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_read_failure_returns_buffer_and_leaves_partial_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("partial.bin");
        let copier = copier();

        let err = copier
            .copy(&StdFs, &mut BrokenReader { remaining: 40_000 }, &dest, 0o644)
            .unwrap_err();

        assert!(matches!(err, OwlError::ReadFailed { .. }));
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 40_000);
        assert_eq!(copier.pool().stats().in_use, 0);
    }

    /// Local filesystem whose durability flush always fails
    struct NoSyncFs;

    impl LocalFs for NoSyncFs {
        type File = std::fs::File;

        fn create_exclusive(&self, path: &Path, mode: u32) -> io::Result<Self::File> {
            StdFs.create_exclusive(path, mode)
        }

        fn make_directories(&self, path: &Path, mode: u32) -> io::Result<bool> {
            StdFs.make_directories(path, mode)
        }

        fn sync(&self, _file: &mut Self::File) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "fsync: input/output error"))
        }

        fn set_permissions(&self, path: &Path, mode: u32) -> io::Result<()> {
            StdFs.set_permissions(path, mode)
        }
    }

    #[test]
    fn test_flush_failure_is_an_error() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("unsynced.bin");
        let copier = copier();

        let err = copier
            .copy(&NoSyncFs, &mut Cursor::new(pattern(100)), &dest, 0o644)
            .unwrap_err();

        assert!(matches!(err, OwlError::FlushFailed { .. }));
        assert_eq!(copier.pool().stats().in_use, 0);
    }
}
