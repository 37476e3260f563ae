//! Owl CLI - pull a remote tree over SFTP

use clap::Parser;
use owl::config::{CliArgs, OutputFormat, SyncConfig};
use owl::core::{SyncEngine, SyncReport};
use owl::error::Result;
use owl::fs::StdFs;
use owl::network::SshConnection;
use owl::progress::ProgressReporter;
use owl::remote::{DirectoryRemote, RemoteFs};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Exit status when a second Ctrl-C aborts the process
const EXIT_INTERRUPTED: i32 = 130;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    init_logging(&args);

    match run(&args) {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Logs go to stderr; stdout carries the report
fn init_logging(args: &CliArgs) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("owl={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &CliArgs) -> Result<SyncReport> {
    let config = SyncConfig::from_cli(args)?;

    if args.verbose > 0 {
        print_config(&config);
    }

    let progress = if config.progress {
        ProgressReporter::new()
    } else {
        ProgressReporter::disabled()
    };

    let engine = SyncEngine::new(config).with_progress(progress);
    let config = engine.config();

    // Connect first so Ctrl-C at the password prompt still aborts
    let report = match &config.remote {
        Some(remote) => {
            let connection = SshConnection::connect(remote)?;
            let report = execute_interruptible(&engine, &connection);
            connection.disconnect();
            report?
        }
        None => execute_interruptible(&engine, &DirectoryRemote)?,
    };

    match config.output_format {
        OutputFormat::Json => match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to serialize report: {}", e),
        },
        OutputFormat::Text if !args.quiet => report.print_summary(),
        OutputFormat::Text => {}
    }

    Ok(report)
}

/// Run the sync with Ctrl-C routed to the engine's cancellation flag
fn execute_interruptible<R: RemoteFs>(engine: &SyncEngine, remote: &R) -> Result<SyncReport> {
    install_interrupt_handler(engine.cancellation_flag());
    engine.execute(remote, &StdFs)
}

/// First Ctrl-C stops new units from starting; a second one exits at once
fn install_interrupt_handler(cancelled: Arc<AtomicBool>) {
    let spawned = std::thread::Builder::new()
        .name("owl-signal".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!("Ctrl-C handling unavailable: {}", e);
                    return;
                }
            };

            runtime.block_on(async {
                loop {
                    if tokio::signal::ctrl_c().await.is_err() {
                        return;
                    }
                    if cancelled.swap(true, Ordering::SeqCst) {
                        eprintln!("Interrupted again, exiting");
                        std::process::exit(EXIT_INTERRUPTED);
                    }
                    eprintln!("Interrupted, finishing transfers in progress (Ctrl-C again to abort)");
                }
            });
        });

    if let Err(e) = spawned {
        tracing::warn!("Ctrl-C handling unavailable: {}", e);
    }
}

fn print_config(config: &SyncConfig) {
    eprintln!("=== Configuration ===");
    eprintln!("Source:      {}", config.source.display());
    eprintln!("Destination: {}", config.destination.display());
    eprintln!("Threads:     {}", config.worker_threads());
    eprintln!("Buffer:      {}", humansize::format_size(config.buffer_size as u64, humansize::BINARY));
    eprintln!("Dry run:     {}", config.dry_run);

    if let Some(ref remote) = config.remote {
        eprintln!("\n=== Remote Configuration ===");
        eprintln!("Host:        {}@{}:{}", remote.user, remote.host, remote.port);
        eprintln!("Auth:        {:?}", remote.auth);
        if let Some(ref known_hosts) = remote.known_hosts {
            eprintln!("Known hosts: {}", known_hosts.display());
        }
    }

    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_execute_interruptible_runs_sync() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let root = src.path().join("tree");
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("sub/a.txt"), b"alpha").unwrap();

        let engine = SyncEngine::new(SyncConfig {
            source: root.clone(),
            destination: dst.path().to_path_buf(),
            ..Default::default()
        });
        let report = execute_interruptible(&engine, &DirectoryRemote).unwrap();

        assert!(report.is_success());
        assert!(!report.cancelled);
        assert_eq!(report.files_copied(), 1);
        assert_eq!(std::fs::read(dst.path().join("tree/sub/a.txt")).unwrap(), b"alpha");
    }
}
