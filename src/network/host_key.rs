//! Server identity verification against an OpenSSH known_hosts file

use crate::error::{OwlError, Result};
use ssh2::{CheckResult, KnownHostFileKind, Session};
use std::path::Path;

/// Verify the handshaken server key of `session` against `known_hosts`.
///
/// Unknown hosts are rejected rather than trusted on first use.
pub fn verify_host_key(session: &Session, host: &str, port: u16, known_hosts: &Path) -> Result<()> {
    let (key, key_type) = session
        .host_key()
        .ok_or_else(|| OwlError::host_key(host, "server did not present a host key"))?;

    let mut known = session
        .known_hosts()
        .map_err(|e| OwlError::host_key(host, e.to_string()))?;

    known
        .read_file(known_hosts, KnownHostFileKind::OpenSSH)
        .map_err(|e| {
            OwlError::host_key(
                host,
                format!("not able to read {} ({})", known_hosts.display(), e),
            )
        })?;

    match known.check_port(host, port, key) {
        CheckResult::Match => {
            tracing::debug!("Host key for {} ({:?}) matches {}", host, key_type, known_hosts.display());
            Ok(())
        }
        CheckResult::Mismatch => Err(OwlError::host_key(
            host,
            format!(
                "host key does not match the entry in {}; the server may have been replaced",
                known_hosts.display()
            ),
        )),
        CheckResult::NotFound => Err(OwlError::host_key(
            host,
            format!(
                "no host key present in {}; connect once with `ssh user@{}` or add it with ssh-keyscan",
                known_hosts.display(),
                host
            ),
        )),
        CheckResult::Failure => Err(OwlError::host_key(host, "known_hosts check failed")),
    }
}
