//! Transfer scheduling
//!
//! Executes an ordered list of transfer units in three steps:
//! 1. Directories, sequentially in walk order, created owner-writable
//! 2. Regular files on a bounded rayon pool
//! 3. Captured directory permissions, deepest first
//!
//! Results are reported in walk order regardless of completion order.

use crate::core::{TransferUnit, UnitOutcome, UnitStatus};
use crate::error::{IoResultExt, OwlError, Result};
use crate::fs::{CopyOutcome, LocalFs, StreamCopier};
use crate::progress::ProgressReporter;
use crate::remote::{EntryKind, RemoteFs};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Runs transfer units against a remote source and a local destination
pub struct TransferScheduler<'a> {
    /// File copier
    copier: StreamCopier,
    /// Worker count for file units
    threads: usize,
    /// Cancellation flag
    cancelled: Arc<AtomicBool>,
    /// Progress reporter
    progress: Option<&'a ProgressReporter>,
}

impl<'a> TransferScheduler<'a> {
    /// Create a scheduler running file units on `threads` workers
    pub fn new(copier: StreamCopier, threads: usize) -> Self {
        Self {
            copier,
            threads: threads.max(1),
            cancelled: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Share a cancellation flag with the caller
    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Report progress while running
    pub fn with_progress(mut self, progress: &'a ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Execute `units` and return one outcome per unit, in the same order.
    ///
    /// Per-unit failures are recorded in the outcomes; only a failure to
    /// start the worker pool is returned as an error.
    pub fn run<R, L>(&self, units: &[TransferUnit], remote: &R, local: &L) -> Result<Vec<UnitOutcome>>
    where
        R: RemoteFs,
        L: LocalFs,
    {
        let mut statuses: Vec<UnitStatus> = vec![UnitStatus::NotAttempted; units.len()];

        let mut files = Vec::new();
        for (index, unit) in units.iter().enumerate() {
            match unit.kind {
                EntryKind::Directory => statuses[index] = self.create_directory(unit, local),
                EntryKind::RegularFile => files.push(index),
                EntryKind::Other => {
                    tracing::debug!("Ignoring {} (not a file or directory)", unit.remote_path.display());
                    statuses[index] = UnitStatus::Ignored;
                    self.tick(0);
                }
            }
        }

        tracing::info!("Transferring {} files on {} workers", files.len(), self.threads);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("owl-worker-{}", i))
            .build()
            .map_err(|e| OwlError::ThreadPoolError(e.to_string()))?;

        let copied: Vec<(usize, UnitStatus)> = pool.install(|| {
            files
                .par_iter()
                .map(|&index| (index, self.copy_file(&units[index], remote, local)))
                .collect()
        });

        for (index, status) in copied {
            statuses[index] = status;
        }

        self.finalize_directories(units, &mut statuses, local);

        Ok(units
            .iter()
            .cloned()
            .zip(statuses)
            .map(|(unit, status)| UnitOutcome { unit, status })
            .collect())
    }

    fn create_directory<L: LocalFs>(&self, unit: &TransferUnit, local: &L) -> UnitStatus {
        if self.is_cancelled() {
            return UnitStatus::NotAttempted;
        }

        let status = match local
            .make_directories(&unit.dest_path, unit.permissions)
            .with_path(&unit.dest_path)
        {
            Ok(true) => {
                tracing::debug!("Created {}", unit.dest_path.display());
                UnitStatus::Created
            }
            Ok(false) => UnitStatus::Existing,
            Err(e) => {
                tracing::warn!("Failed to create {}: {}", unit.dest_path.display(), e);
                UnitStatus::Failed { error: e.to_string() }
            }
        };

        self.tick(0);
        status
    }

    fn copy_file<R: RemoteFs, L: LocalFs>(&self, unit: &TransferUnit, remote: &R, local: &L) -> UnitStatus {
        if self.is_cancelled() {
            return UnitStatus::NotAttempted;
        }

        if let Some(progress) = self.progress {
            progress.set_current_file(&unit.remote_path.to_string_lossy());
        }

        let result = remote.open_read(&unit.remote_path).and_then(|mut reader| {
            self.copier
                .copy(local, &mut reader, &unit.dest_path, unit.permissions)
        });

        let (status, bytes) = match result {
            Ok(CopyOutcome::Copied(bytes)) => {
                tracing::debug!("Copied {} ({} bytes)", unit.remote_path.display(), bytes);
                (UnitStatus::Copied { bytes }, bytes)
            }
            Ok(CopyOutcome::Skipped) => (UnitStatus::Skipped, 0),
            Err(e) => {
                tracing::warn!("Failed to copy {}: {}", unit.remote_path.display(), e);
                (UnitStatus::Failed { error: e.to_string() }, 0)
            }
        };

        self.tick(bytes);
        status
    }

    /// Apply captured directory modes, children before parents, so
    /// read-only directories are locked only after their contents exist
    fn finalize_directories<L: LocalFs>(
        &self,
        units: &[TransferUnit],
        statuses: &mut [UnitStatus],
        local: &L,
    ) {
        for (unit, status) in units.iter().zip(statuses.iter_mut()).rev() {
            if !matches!(status, UnitStatus::Created) {
                continue;
            }
            if let Err(e) = local
                .set_permissions(&unit.dest_path, unit.permissions)
                .with_path(&unit.dest_path)
            {
                tracing::warn!("Failed to set permissions on {}: {}", unit.dest_path.display(), e);
                *status = UnitStatus::Failed { error: e.to_string() };
            }
        }
    }

    fn tick(&self, bytes: u64) {
        if let Some(progress) = self.progress {
            progress.increment_files(1);
            if bytes > 0 {
                progress.increment_bytes(bytes);
            }
        }
    }
}
