//! Local filesystem access
//!
//! The copy engine and scheduler only touch the destination through
//! [`LocalFs`], which keeps exclusive creation, directory creation and the
//! durability flush in one place.

use std::fs::{DirBuilder, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Owner read/write/execute, OR-ed into directory modes while a run is
/// still writing into them
pub const OWNER_RWX: u32 = 0o700;

/// Destination side of a transfer
pub trait LocalFs: Send + Sync {
    /// Writable handle returned by [`LocalFs::create_exclusive`]
    type File: Write;

    /// Create a new file, failing with `AlreadyExists` if anything is there
    fn create_exclusive(&self, path: &Path, mode: u32) -> io::Result<Self::File>;

    /// Create a directory and any missing ancestors.
    ///
    /// Returns `false` when the directory was already there.
    fn make_directories(&self, path: &Path, mode: u32) -> io::Result<bool>;

    /// Flush written data to stable storage
    fn sync(&self, file: &mut Self::File) -> io::Result<()>;

    /// Apply permission bits to an existing path
    fn set_permissions(&self, path: &Path, mode: u32) -> io::Result<()>;
}

/// [`LocalFs`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl LocalFs for StdFs {
    type File = File;

    fn create_exclusive(&self, path: &Path, mode: u32) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode | 0o600);
        }

        let file = options.open(path)?;

        // The umask filtered the open mode; apply the exact bits
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(mode & 0o7777))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        Ok(file)
    }

    fn make_directories(&self, path: &Path, mode: u32) -> io::Result<bool> {
        if path.is_dir() {
            return Ok(false);
        }

        let mut builder = DirBuilder::new();
        builder.recursive(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode | OWNER_RWX);
        }
        #[cfg(not(unix))]
        let _ = mode;

        match builder.create(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn sync(&self, file: &mut File) -> io::Result<()> {
        file.flush()?;
        file.sync_all()
    }

    fn set_permissions(&self, path: &Path, mode: u32) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
        }
        #[cfg(not(unix))]
        {
            let _ = (path, mode);
            Ok(())
        }
    }
}
