//! # Owl - Remote Tree Sync over SFTP
//!
//! Owl mirrors a directory tree (or a single file) from an SSH server onto
//! the local filesystem. It only ever adds: files that already exist at
//! the destination are left untouched, so an interrupted run can simply be
//! repeated to fetch what is still missing.
//!
//! ## Features
//!
//! - **Ordered Enumeration**: Depth-first pre-order walk, parents before children
//! - **Durable Writes**: Every copied file is flushed to stable storage
//! - **Parallel Transfers**: Bounded worker pool over one SFTP session
//! - **Permission Preservation**: Captured mode bits applied exactly
//! - **Fail-soft Runs**: One unreadable subtree or file never aborts the rest
//! - **Host Key Verification**: Checked against `~/.ssh/known_hosts`
//!
//! ## Quick Start
//!
//! ```no_run
//! use owl::core::sync_directory;
//! use std::path::Path;
//!
//! let report = sync_directory(Path::new("/srv/data"), Path::new("/backup")).unwrap();
//! println!("Copied {} files ({} bytes)", report.files_copied(), report.bytes_copied());
//! ```
//!
//! ## Remote Source
//!
//! ```no_run
//! use owl::config::{AuthMethod, RemoteConfig, SyncConfig};
//! use owl::core::SyncEngine;
//! use owl::fs::StdFs;
//! use owl::network::SshConnection;
//! use std::path::PathBuf;
//!
//! let remote = RemoteConfig {
//!     host: "files.example.com".to_string(),
//!     user: "alice".to_string(),
//!     port: 22,
//!     auth: AuthMethod::Agent,
//!     known_hosts: None,
//! };
//! let connection = SshConnection::connect(&remote).unwrap();
//!
//! let config = SyncConfig {
//!     source: PathBuf::from("/home/alice/data"),
//!     destination: PathBuf::from("/backup"),
//!     remote: Some(remote),
//!     threads: 4,
//!     ..Default::default()
//! };
//!
//! let report = SyncEngine::new(config).execute(&connection, &StdFs).unwrap();
//! report.print_summary();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod network;
pub mod progress;
pub mod remote;

// Re-export commonly used types
pub use config::{AuthMethod, RemoteConfig, SyncConfig};
pub use core::{SyncEngine, SyncReport};
pub use error::{OwlError, Result};
pub use progress::ProgressReporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use owl::prelude::*;
    //! ```

    pub use crate::config::{AuthMethod, RemoteConfig, SyncConfig};
    pub use crate::core::{sync_directory, SyncEngine, SyncReport, UnitStatus};
    pub use crate::error::{OwlError, Result};
    pub use crate::fs::{LocalFs, StdFs};
    pub use crate::network::SshConnection;
    pub use crate::progress::ProgressReporter;
    pub use crate::remote::{DirectoryRemote, RemoteFs};
}
