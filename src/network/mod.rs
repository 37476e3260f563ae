//! Network module
//!
//! Establishes the authenticated SSH/SFTP session a sync run reads from:
//! TCP dial, handshake, known_hosts verification, then password, key file
//! or ssh-agent authentication.

mod host_key;
mod ssh;

pub use host_key::*;
pub use ssh::*;
