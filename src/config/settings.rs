//! Configuration settings for Owl
//!
//! Defines the CLI arguments, the runtime configuration derived from them,
//! and the helpers used to parse remote locations and sizes.

use crate::error::{OwlError, Result};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default copy buffer size (32 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Largest accepted copy buffer; each worker holds one
pub const MAX_BUFFER_SIZE: u64 = 64 * 1024 * 1024;

/// Owl - pull a remote directory tree over SFTP
#[derive(Parser, Debug, Clone)]
#[command(name = "owl")]
#[command(author = "Owl Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Copy a remote file or directory tree to the local machine over SFTP")]
#[command(long_about = r#"
Owl reproduces a remote file or directory tree under a local destination,
preserving contents and permission bits. Files that already exist locally
are left untouched, so interrupted runs can simply be repeated.

Examples:
  owl alice@build01:/srv/data ./mirror          # Password prompt
  owl -k alice@build01:/srv/data ./mirror       # ~/.ssh/id_rsa
  owl -i ~/.ssh/deploy alice@build01:logs ./out # Explicit key file
  owl --agent -t 4 alice@build01:/srv ./mirror  # ssh-agent, 4 workers
"#)]
pub struct CliArgs {
    /// Remote source (user@host:path)
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Local destination path
    #[arg(value_name = "DESTINATION")]
    pub destination: String,

    /// SSH port
    #[arg(long, default_value = "22", value_name = "PORT")]
    pub port: u16,

    /// Authenticate with this private key file
    #[arg(short = 'i', long = "identity", value_name = "PATH")]
    pub identity: Option<PathBuf>,

    /// Authenticate with the default private key (~/.ssh/id_rsa)
    #[arg(short = 'k', long = "key")]
    pub use_key: bool,

    /// Authenticate through a running ssh-agent
    #[arg(long, conflicts_with_all = ["identity", "use_key"])]
    pub agent: bool,

    /// known_hosts file used to verify the server (default: ~/.ssh/known_hosts)
    #[arg(long, value_name = "PATH")]
    pub known_hosts: Option<PathBuf>,

    /// Number of parallel file workers (0 = one per CPU)
    #[arg(short = 't', long, default_value = "1", value_name = "NUM")]
    pub threads: usize,

    /// Copy buffer size (e.g., 32K, 1M; at most 64M)
    #[arg(short = 'b', long, default_value = "32K", value_name = "SIZE")]
    pub buffer_size: String,

    /// List what would be transferred without touching the destination
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Show progress bars
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged, no summary)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Output format for the run report
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// How the client proves its identity to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Interactive password prompt
    Password,
    /// Private key file
    KeyFile(PathBuf),
    /// Identities held by ssh-agent
    Agent,
}

/// Remote host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Remote hostname or IP
    pub host: String,
    /// Username
    pub user: String,
    /// Port
    pub port: u16,
    /// Authentication method
    pub auth: AuthMethod,
    /// known_hosts file override
    pub known_hosts: Option<PathBuf>,
}

impl RemoteConfig {
    /// `host:port` string used for dialing
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Traversal root on the source side
    pub source: PathBuf,
    /// Local destination base
    pub destination: PathBuf,
    /// Remote host info; `None` means the source is a local path
    pub remote: Option<RemoteConfig>,
    /// Worker count for file units (0 = auto)
    pub threads: usize,
    /// Copy buffer size in bytes
    pub buffer_size: usize,
    /// Enumerate only
    pub dry_run: bool,
    /// Show progress bars
    pub progress: bool,
    /// Report format
    pub output_format: OutputFormat,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            remote: None,
            threads: 1,
            buffer_size: DEFAULT_BUFFER_SIZE,
            dry_run: false,
            progress: false,
            output_format: OutputFormat::Text,
        }
    }
}

impl SyncConfig {
    /// Create config from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        if args.source.trim().is_empty() {
            return Err(OwlError::config("remote location is a mandatory parameter"));
        }
        if args.destination.trim().is_empty() {
            return Err(OwlError::config("destination is a mandatory parameter"));
        }

        let mut config = Self::default();

        if let Some((user, host, path)) = parse_remote_path(&args.source) {
            if user.is_empty() || host.is_empty() {
                return Err(OwlError::config(format!(
                    "malformed remote source '{}', expected user@host:path",
                    args.source
                )));
            }
            config.source = path;
            config.remote = Some(RemoteConfig {
                user,
                host,
                port: args.port,
                auth: auth_method_from_cli(args)?,
                known_hosts: args.known_hosts.clone(),
            });
        } else {
            config.source = PathBuf::from(&args.source);
        }

        if config.source.as_os_str().is_empty() {
            return Err(OwlError::config("remote path must not be empty"));
        }

        config.destination = PathBuf::from(&args.destination);
        config.threads = args.threads;
        let buffer_size = parse_size(&args.buffer_size)
            .map_err(|e| OwlError::config(format!("Invalid buffer size: {}", e)))?;
        if buffer_size == 0 {
            return Err(OwlError::config("buffer size must be greater than zero"));
        }
        if buffer_size > MAX_BUFFER_SIZE {
            return Err(OwlError::config(format!(
                "buffer size {} exceeds the {} limit",
                args.buffer_size,
                humansize::format_size(MAX_BUFFER_SIZE, humansize::BINARY)
            )));
        }
        config.buffer_size = buffer_size as usize;
        config.dry_run = args.dry_run;
        config.progress = args.progress && !args.quiet;
        config.output_format = args.output_format;

        Ok(config)
    }

    /// Effective worker count
    pub fn worker_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

fn auth_method_from_cli(args: &CliArgs) -> Result<AuthMethod> {
    if args.agent {
        return Ok(AuthMethod::Agent);
    }
    if let Some(identity) = &args.identity {
        return Ok(AuthMethod::KeyFile(identity.clone()));
    }
    if args.use_key {
        return Ok(AuthMethod::KeyFile(default_identity_file()?));
    }
    Ok(AuthMethod::Password)
}

/// Current user's home directory
pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| OwlError::config("not able to determine the current user's home directory"))
}

/// `~/.ssh/id_rsa`
pub fn default_identity_file() -> Result<PathBuf> {
    Ok(home_dir()?.join(".ssh").join("id_rsa"))
}

/// `~/.ssh/known_hosts`
pub fn default_known_hosts_file() -> Result<PathBuf> {
    Ok(home_dir()?.join(".ssh").join("known_hosts"))
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> std::result::Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("GB") || size.ends_with('G') {
        (size.trim_end_matches(|c| c == 'G' || c == 'B'), 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        (size.trim_end_matches(|c| c == 'M' || c == 'B'), 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        (size.trim_end_matches(|c| c == 'K' || c == 'B'), 1024u64)
    } else if size.ends_with('B') {
        (size.trim_end_matches('B'), 1u64)
    } else {
        // Assume bytes if no suffix
        (size.as_str(), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    if num < 0.0 {
        return Err(format!("Negative size: {}", num_str));
    }

    Ok((num * multiplier as f64) as u64)
}

/// Parse remote path (user@host:path)
///
/// Returns `None` for anything that does not look like `user@host:path`,
/// including Windows drive paths and plain local paths.
pub fn parse_remote_path(path: &str) -> Option<(String, String, PathBuf)> {
    let (user_host, remote_path) = path.split_once(':')?;
    let (user, host) = user_host.split_once('@')?;
    if host.contains('/') || user.contains('/') {
        return None;
    }
    Some((user.to_string(), host.to_string(), PathBuf::from(remote_path)))
}

/// Resolve a user-supplied path starting with `~/`
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir().map(|h| h.join(rest)).unwrap_or_else(|_| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
