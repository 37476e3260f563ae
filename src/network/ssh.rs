//! SSH session establishment
//!
//! Dials the server, verifies its host key, authenticates with the
//! configured [`AuthMethod`] and opens the SFTP channel used as the
//! remote side of a sync run.

use crate::config::{default_known_hosts_file, expand_tilde, AuthMethod, RemoteConfig};
use crate::error::{OwlError, Result};
use crate::network::verify_host_key;
use ssh2::{Session, Sftp};
use std::net::TcpStream;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Authenticated SFTP session
pub struct SshConnection {
    /// SSH session
    session: Session,
    /// SFTP channel, one request at a time
    sftp: Mutex<Sftp>,
    /// Remote configuration
    config: RemoteConfig,
}

impl SshConnection {
    /// Connect to remote host
    pub fn connect(config: &RemoteConfig) -> Result<Self> {
        let tcp = TcpStream::connect(config.address())
            .map_err(|e| OwlError::connection(&config.host, e.to_string()))?;

        let mut session = Session::new()
            .map_err(|e| OwlError::connection(&config.host, e.to_string()))?;

        session.set_tcp_stream(tcp);
        session.handshake()
            .map_err(|e| OwlError::connection(&config.host, e.to_string()))?;

        let known_hosts = match &config.known_hosts {
            Some(path) => expand_tilde(path),
            None => default_known_hosts_file()?,
        };
        verify_host_key(&session, &config.host, config.port, &known_hosts)?;

        Self::authenticate(&session, config)?;

        let sftp = session.sftp()
            .map_err(|e| OwlError::connection(&config.host, e.to_string()))?;

        tracing::info!("Connected to {}@{}", config.user, config.address());

        Ok(Self {
            session,
            sftp: Mutex::new(sftp),
            config: config.clone(),
        })
    }

    /// Authenticate with the remote host
    fn authenticate(session: &Session, config: &RemoteConfig) -> Result<()> {
        let auth_err = |message: String| OwlError::auth(&config.user, &config.host, message);

        match &config.auth {
            AuthMethod::Password => {
                let password = rpassword::prompt_password(format!(
                    "{}@{}'s password: ",
                    config.user, config.host
                ))
                .map_err(|e| auth_err(format!("not able to read password ({})", e)))?;

                if password.is_empty() {
                    return Err(auth_err("password can not be empty".to_string()));
                }

                session.userauth_password(&config.user, &password)
                    .map_err(|e| auth_err(e.to_string()))?;
            }
            AuthMethod::KeyFile(key_path) => {
                let key_path = expand_tilde(key_path);
                if !key_path.is_file() {
                    return Err(auth_err(format!(
                        "not able to read private key {}",
                        key_path.display()
                    )));
                }

                session.userauth_pubkey_file(&config.user, None, &key_path, None)
                    .map_err(|e| auth_err(e.to_string()))?;
            }
            AuthMethod::Agent => {
                session.userauth_agent(&config.user)
                    .map_err(|e| auth_err(format!("no usable identity in ssh-agent ({})", e)))?;
            }
        }

        if !session.authenticated() {
            return Err(auth_err("Authentication failed".to_string()));
        }

        Ok(())
    }

    /// SFTP channel
    pub(crate) fn sftp(&self) -> MutexGuard<'_, Sftp> {
        self.sftp.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close the session politely
    pub fn disconnect(&self) {
        if let Err(e) = self.session.disconnect(None, "owl: sync finished", None) {
            tracing::debug!("Disconnect from {} failed: {}", self.config.host, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    // Note: These tests require an SSH server to be available
    // They are marked as ignore by default

    #[test]
    #[ignore]
    fn test_ssh_connection() {
        let config = RemoteConfig {
            host: "localhost".to_string(),
            user: std::env::var("USER").unwrap_or_else(|_| "test".to_string()),
            port: 22,
            auth: AuthMethod::Agent,
            known_hosts: None,
        };

        let conn = SshConnection::connect(&config);
        assert!(conn.is_ok());
    }

    #[test]
    fn test_missing_key_file_is_auth_error() {
        let config = RemoteConfig {
            host: "127.0.0.1".to_string(),
            user: "nobody".to_string(),
            port: 1,
            auth: AuthMethod::KeyFile(PathBuf::from("/definitely/not/here/id_rsa")),
            known_hosts: None,
        };

        // Nothing listens on port 1, so this fails during setup either way
        let err = SshConnection::connect(&config).err().unwrap();
        assert!(matches!(
            err,
            OwlError::ConnectionError { .. } | OwlError::AuthenticationError { .. }
        ));
    }
}
