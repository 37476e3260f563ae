//! Error types for Owl
//!
//! This module defines all error types used throughout the application,
//! separating fatal setup failures from per-unit transfer failures.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Owl operations
#[derive(Error, Debug)]
pub enum OwlError {
    /// I/O error during local file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// Path the operation was acting on
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File or directory not found
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Remote SFTP operation failed
    #[error("Remote error at '{path}': {message}")]
    Remote {
        /// Remote path
        path: PathBuf,
        /// Message reported by the SFTP layer
        message: String,
    },

    /// Reading the source stream failed mid-copy
    #[error("Failed reading source for '{path}': {source}")]
    ReadFailed {
        /// Destination being written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Data was written but could not be made durable
    #[error("Failed to flush '{path}' to disk: {source}")]
    FlushFailed {
        /// Destination file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Invalid or unsafe path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Network/SSH connection error
    #[error("Connection error to '{host}': {message}")]
    ConnectionError {
        /// Remote host
        host: String,
        /// What went wrong
        message: String,
    },

    /// SSH authentication failed
    #[error("SSH authentication failed for '{user}@{host}': {message}")]
    AuthenticationError {
        /// Login user
        user: String,
        /// Remote host
        host: String,
        /// What went wrong
        message: String,
    },

    /// Server identity could not be verified
    #[error("Host key verification failed for '{host}': {message}")]
    HostKeyError {
        /// Remote host
        host: String,
        /// What went wrong
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Thread pool error
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),
}

impl OwlError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a remote error
    pub fn remote(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Remote {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionError {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(
        user: impl Into<String>,
        host: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::AuthenticationError {
            user: user.into(),
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a host key error
    pub fn host_key(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HostKeyError {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}

/// Result type alias for Owl operations
pub type Result<T> = std::result::Result<T, OwlError>;

impl From<std::io::Error> for OwlError {
    fn from(err: std::io::Error) -> Self {
        OwlError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            let path = path.into();
            match e.kind() {
                std::io::ErrorKind::NotFound => OwlError::NotFound(path),
                std::io::ErrorKind::PermissionDenied => OwlError::PermissionDenied(path),
                _ => OwlError::io(path, e),
            }
        })
    }
}
