//! [`RemoteFs`] over an SFTP channel

use crate::error::{OwlError, Result};
use crate::network::SshConnection;
use crate::remote::{RemoteDirEntry, RemoteFs, RemoteStat};
use ssh2::{ErrorCode, FileStat};
use std::path::{Path, PathBuf};

// SSH_FX_* status codes (draft-ietf-secsh-filexfer-02)
const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;
const FX_NO_SUCH_PATH: i32 = 10;

fn map_sftp_error(path: &Path, err: ssh2::Error) -> OwlError {
    match err.code() {
        ErrorCode::SFTP(FX_NO_SUCH_FILE) | ErrorCode::SFTP(FX_NO_SUCH_PATH) => {
            OwlError::NotFound(path.to_path_buf())
        }
        ErrorCode::SFTP(FX_PERMISSION_DENIED) => OwlError::PermissionDenied(path.to_path_buf()),
        _ => OwlError::remote(path, err.message()),
    }
}

fn remote_stat(stat: &FileStat) -> RemoteStat {
    RemoteStat::from_mode(stat.perm.unwrap_or(0), stat.size.unwrap_or(0))
}

impl RemoteFs for SshConnection {
    type Reader = ssh2::File;

    fn stat(&self, path: &Path) -> Result<RemoteStat> {
        let stat = self.sftp().stat(path).map_err(|e| map_sftp_error(path, e))?;
        Ok(remote_stat(&stat))
    }

    fn open_read(&self, path: &Path) -> Result<ssh2::File> {
        self.sftp().open(path).map_err(|e| map_sftp_error(path, e))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<RemoteDirEntry>> {
        let entries = self.sftp().readdir(path).map_err(|e| map_sftp_error(path, e))?;

        Ok(entries
            .into_iter()
            .map(|(full, stat)| RemoteDirEntry {
                // Whatever the server sent as the name; the walker vets it
                name: full
                    .strip_prefix(path)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| PathBuf::from(&full)),
                stat: remote_stat(&stat),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sftp_error(code: i32) -> ssh2::Error {
        ssh2::Error::new(ErrorCode::SFTP(code), "sftp failure")
    }

    #[test]
    fn test_missing_file_and_path_are_not_found() {
        let path = Path::new("/srv/data/gone.txt");
        for code in [2, 10] {
            match map_sftp_error(path, sftp_error(code)) {
                OwlError::NotFound(p) => assert_eq!(p, path),
                other => panic!("code {} mapped to {:?}", code, other),
            }
        }
    }

    #[test]
    fn test_permission_denied() {
        let path = Path::new("/root/secret");
        assert!(matches!(
            map_sftp_error(path, sftp_error(3)),
            OwlError::PermissionDenied(p) if p == path
        ));
    }

    #[test]
    fn test_other_codes_are_remote_errors() {
        let path = Path::new("/srv/data/f");
        // SSH_FX_FAILURE, then a session-level error
        for err in [sftp_error(4), ssh2::Error::new(ErrorCode::Session(-7), "socket send")] {
            assert!(matches!(
                map_sftp_error(path, err),
                OwlError::Remote { path: p, .. } if p == path
            ));
        }
    }
}
