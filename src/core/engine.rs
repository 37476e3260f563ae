//! Sync engine
//!
//! Orchestrates one run: enumerate the remote tree, then hand the ordered
//! transfer units to the scheduler and collect a [`SyncReport`].

use crate::config::SyncConfig;
use crate::core::{
    SyncReport, TransferScheduler, TransferUnit, TreeWalker, UnitOutcome, UnitStatus, Walk,
};
use crate::error::Result;
use crate::fs::{BufferPool, LocalFs, StdFs, StreamCopier};
use crate::progress::ProgressReporter;
use crate::remote::{DirectoryRemote, EntryKind, RemoteFs};
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Main sync engine
pub struct SyncEngine {
    /// Configuration
    config: SyncConfig,
    /// Progress reporter
    progress: Option<ProgressReporter>,
    /// Cancellation flag
    cancelled: Arc<AtomicBool>,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set progress reporter
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Get cancellation flag for external control
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Cancel the run; units not yet started are left alone
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Configuration in use
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Execute the sync from `remote` into `local`.
    ///
    /// Only setup failures are returned as errors: an unreachable root or a
    /// worker pool that cannot start. Everything else lands in the report.
    pub fn execute<R: RemoteFs, L: LocalFs>(&self, remote: &R, local: &L) -> Result<SyncReport> {
        let started_at = Utc::now();
        let start_time = Instant::now();

        if let Some(progress) = &self.progress {
            progress.set_status("Enumerating remote tree...");
        }

        let walk = self.enumerate(remote)?;
        tracing::info!(
            "Enumerated {} entries under {} ({} unreadable)",
            walk.units.len(),
            self.config.source.display(),
            walk.failures.len()
        );

        let outcomes = if self.config.dry_run {
            planned(walk.units)
        } else {
            self.transfer(&walk, remote, local)?
        };

        let report = SyncReport {
            source: self.config.source.clone(),
            destination: self.config.destination.clone(),
            started_at,
            duration: start_time.elapsed(),
            outcomes,
            walk_failures: walk.failures,
            cancelled: self.is_cancelled(),
            dry_run: self.config.dry_run,
        };

        if let Some(progress) = &self.progress {
            let summary = progress.summary();
            tracing::info!(
                "Processed {}/{} entries, {:.1}% of {} bytes in {:.2?}",
                summary.files_copied,
                summary.total_files,
                summary.percentage(),
                summary.total_bytes,
                summary.elapsed
            );

            if report.is_success() {
                progress.finish_success("Sync complete");
            } else if report.cancelled {
                progress.finish_error("Sync cancelled");
            } else {
                progress.finish_error(&format!("{} failures", report.failure_count()));
            }
        }

        Ok(report)
    }

    fn enumerate<R: RemoteFs>(&self, remote: &R) -> Result<Walk> {
        let mut walk = Walk::default();

        for item in TreeWalker::new(remote, &self.config.source, &self.config.destination)? {
            if self.is_cancelled() {
                tracing::info!("Enumeration interrupted");
                break;
            }
            match item {
                Ok(unit) => walk.units.push(unit),
                Err(failure) => walk.failures.push(failure),
            }
        }

        Ok(walk)
    }

    fn transfer<R: RemoteFs, L: LocalFs>(&self, walk: &Walk, remote: &R, local: &L) -> Result<Vec<UnitOutcome>> {
        let threads = self.config.worker_threads();

        if let Some(progress) = &self.progress {
            let total_bytes = walk
                .units
                .iter()
                .filter(|u| u.kind == EntryKind::RegularFile)
                .map(|u| u.size)
                .sum();
            progress.set_total_files(walk.units.len() as u64);
            progress.set_total_bytes(total_bytes);
            progress.set_status("Transferring...");
        }

        let pool = Arc::new(BufferPool::for_workers(self.config.buffer_size, threads));
        let mut scheduler = TransferScheduler::new(StreamCopier::new(pool), threads)
            .with_cancellation(self.cancellation_flag());
        if let Some(progress) = &self.progress {
            scheduler = scheduler.with_progress(progress);
        }

        scheduler.run(&walk.units, remote, local)
    }
}

fn planned(units: Vec<TransferUnit>) -> Vec<UnitOutcome> {
    units
        .into_iter()
        .map(|unit| {
            let status = match unit.kind {
                EntryKind::Other => UnitStatus::Ignored,
                _ => UnitStatus::Planned,
            };
            UnitOutcome { unit, status }
        })
        .collect()
}

/// Sync a local directory tree with default settings
pub fn sync_directory(source: &Path, destination: &Path) -> Result<SyncReport> {
    let config = SyncConfig {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        ..Default::default()
    };

    SyncEngine::new(config).execute(&DirectoryRemote, &StdFs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OwlError;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_structure(dir: &Path) {
        std::fs::create_dir_all(dir.join("subdir1")).unwrap();
        std::fs::create_dir_all(dir.join("subdir2/nested")).unwrap();

        File::create(dir.join("tiny.txt")).unwrap()
            .write_all(b"tiny").unwrap();

        let mut small = File::create(dir.join("small.bin")).unwrap();
        small.write_all(&vec![0xABu8; 10 * 1024]).unwrap();

        let mut medium = File::create(dir.join("subdir1/medium.bin")).unwrap();
        medium.write_all(&vec![0xCDu8; 100 * 1024]).unwrap();

        File::create(dir.join("subdir2/nested/deep.txt")).unwrap()
            .write_all(b"deep file content").unwrap();
    }

    fn config(source: &Path, destination: &Path) -> SyncConfig {
        SyncConfig {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sync_directory() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let root = src.path().join("tree");
        create_test_structure(&root);

        let report = sync_directory(&root, dst.path()).unwrap();

        assert!(report.is_success());
        assert_eq!(report.files_copied(), 4);
        assert_eq!(report.dirs_created(), 4);
        assert_eq!(report.bytes_copied(), 4 + 10 * 1024 + 100 * 1024 + 17);
        assert_eq!(
            std::fs::read(dst.path().join("tree/subdir2/nested/deep.txt")).unwrap(),
            b"deep file content"
        );
    }

    #[test]
    fn test_incremental_sync() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let root = src.path().join("tree");
        create_test_structure(&root);

        let first = sync_directory(&root, dst.path()).unwrap();
        std::fs::write(root.join("subdir1/new.txt"), b"fresh").unwrap();
        let second = sync_directory(&root, dst.path()).unwrap();

        assert!(second.is_success());
        assert_eq!(second.files_copied(), 1);
        assert_eq!(second.files_skipped(), first.files_copied());
        assert_eq!(second.bytes_copied(), 5);
    }

    #[test]
    fn test_parallel_sync() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let root = src.path().join("tree");
        create_test_structure(&root);

        let engine = SyncEngine::new(SyncConfig {
            threads: 4,
            ..config(&root, dst.path())
        })
        .with_progress(ProgressReporter::disabled());
        let report = engine.execute(&DirectoryRemote, &StdFs).unwrap();

        assert!(report.is_success());
        assert_eq!(report.files_copied(), 4);
    }

    #[test]
    fn test_single_file_root() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let file = src.path().join("notes.txt");
        std::fs::write(&file, b"just one").unwrap();
        let target = dst.path().join("renamed.txt");

        let report = sync_directory(&file, &target).unwrap();

        assert!(report.is_success());
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(std::fs::read(&target).unwrap(), b"just one");
    }

    #[test]
    fn test_single_file_onto_existing_directory_fails() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let file = src.path().join("notes.txt");
        std::fs::write(&file, b"just one").unwrap();

        let report = sync_directory(&file, dst.path()).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.files_skipped(), 0);
        assert_eq!(std::fs::read_dir(dst.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_local_directory_where_file_belongs_fails() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let root = src.path().join("tree");
        create_test_structure(&root);
        std::fs::create_dir_all(dst.path().join("tree/tiny.txt")).unwrap();

        let report = sync_directory(&root, dst.path()).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.files_skipped(), 0);
        assert_eq!(report.files_copied(), 3);
        let failed: Vec<_> = report.failures().map(|o| o.unit.remote_path.clone()).collect();
        assert_eq!(failed, vec![root.join("tiny.txt")]);
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let root = src.path().join("tree");
        create_test_structure(&root);

        let engine = SyncEngine::new(SyncConfig {
            dry_run: true,
            ..config(&root, &dst.path().join("out"))
        });
        let report = engine.execute(&DirectoryRemote, &StdFs).unwrap();

        assert!(report.dry_run);
        assert_eq!(report.outcomes.len(), 8);
        assert!(report.outcomes.iter().all(|o| o.status == UnitStatus::Planned));
        assert!(!dst.path().join("out").exists());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();

        let result = sync_directory(&src.path().join("absent"), dst.path());
        assert!(matches!(result, Err(OwlError::NotFound(_))));
    }

    #[test]
    fn test_cancelled_before_start() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let root = src.path().join("tree");
        create_test_structure(&root);

        let engine = SyncEngine::new(config(&root, dst.path()));
        engine.cancel();
        let report = engine.execute(&DirectoryRemote, &StdFs).unwrap();

        assert!(report.cancelled);
        assert!(!report.is_success());
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.status == UnitStatus::NotAttempted));
        assert!(!dst.path().join("tree").exists());
    }
}
