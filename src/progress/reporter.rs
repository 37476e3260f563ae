//! Progress reporter implementation
//!
//! Uses indicatif for a two-bar display while a sync runs:
//! - Transfer-unit progress (directories and files)
//! - Byte progress with throughput and ETA

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const MAX_PATH_DISPLAY: usize = 60;

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Progress reporter for sync runs
pub struct ProgressReporter {
    /// Multi-progress container
    multi: MultiProgress,
    /// Main progress bar (bytes)
    bytes_bar: ProgressBar,
    /// Unit count progress bar
    files_bar: ProgressBar,
    /// Current status message
    status: ProgressBar,
    /// Start time
    start_time: Instant,
    /// Total bytes to transfer
    total_bytes: AtomicU64,
    /// Total units to process
    total_files: AtomicU64,
    /// Bytes transferred so far
    bytes_copied: AtomicU64,
    /// Units processed so far
    files_copied: AtomicU64,
}

impl ProgressReporter {
    /// Create a new progress reporter drawing to stderr
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let status = multi.add(ProgressBar::new_spinner());
        status.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        let files_bar = multi.add(ProgressBar::new(0));
        files_bar.set_style(bar_style(
            "{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} entries ({percent}%)",
        ));
        files_bar.set_prefix("Items");

        let bytes_bar = multi.add(ProgressBar::new(0));
        bytes_bar.set_style(bar_style(
            "{prefix:.bold.dim} [{bar:40.green/white}] {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta})",
        ));
        bytes_bar.set_prefix("Data ");

        Self {
            multi,
            bytes_bar,
            files_bar,
            status,
            start_time: Instant::now(),
            total_bytes: AtomicU64::new(0),
            total_files: AtomicU64::new(0),
            bytes_copied: AtomicU64::new(0),
            files_copied: AtomicU64::new(0),
        }
    }

    /// Create a progress reporter that only counts (quiet mode, tests)
    pub fn disabled() -> Self {
        let reporter = Self::new();
        reporter.multi.set_draw_target(ProgressDrawTarget::hidden());
        reporter
    }

    /// Set total bytes to transfer
    pub fn set_total_bytes(&self, total: u64) {
        self.total_bytes.store(total, Ordering::Relaxed);
        self.bytes_bar.set_length(total);
    }

    /// Set total units to process
    pub fn set_total_files(&self, total: u64) {
        self.total_files.store(total, Ordering::Relaxed);
        self.files_bar.set_length(total);
    }

    /// Increment bytes transferred
    pub fn increment_bytes(&self, bytes: u64) {
        self.bytes_copied.fetch_add(bytes, Ordering::Relaxed);
        self.bytes_bar.inc(bytes);
    }

    /// Increment units processed
    pub fn increment_files(&self, count: u64) {
        self.files_copied.fetch_add(count, Ordering::Relaxed);
        self.files_bar.inc(count);
    }

    /// Set current status message
    pub fn set_status(&self, msg: &str) {
        self.status.set_message(msg.to_string());
    }

    /// Set the path currently being transferred
    pub fn set_current_file(&self, path: &str) {
        let chars = path.chars().count();
        let display = if chars > MAX_PATH_DISPLAY {
            let tail: String = path.chars().skip(chars - (MAX_PATH_DISPLAY - 3)).collect();
            format!("...{}", tail)
        } else {
            path.to_string()
        };
        self.status.set_message(display);
    }

    fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get current throughput in bytes/second
    pub fn throughput(&self) -> f64 {
        let bytes = self.bytes_copied.load(Ordering::Relaxed);
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            bytes as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Finish progress with success message
    pub fn finish_success(&self, message: &str) {
        self.status.finish_with_message(format!("✓ {}", message));
        self.files_bar.finish();
        self.bytes_bar.finish();
    }

    /// Finish progress with error message
    pub fn finish_error(&self, message: &str) {
        self.status.finish_with_message(format!("✗ {}", message));
        self.files_bar.abandon();
        self.bytes_bar.abandon();
    }

    /// Get progress summary
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            total_bytes: self.total_bytes.load(Ordering::Relaxed),
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
            total_files: self.total_files.load(Ordering::Relaxed),
            files_copied: self.files_copied.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
            throughput: self.throughput(),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress summary
#[derive(Debug, Clone)]
pub struct ProgressSummary {
    /// Total bytes to transfer
    pub total_bytes: u64,
    /// Bytes transferred so far
    pub bytes_copied: u64,
    /// Total units
    pub total_files: u64,
    /// Units processed so far
    pub files_copied: u64,
    /// Elapsed time
    pub elapsed: Duration,
    /// Throughput in bytes/second
    pub throughput: f64,
}

impl ProgressSummary {
    /// Get completion percentage by bytes
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            (self.bytes_copied as f64 / self.total_bytes as f64) * 100.0
        }
    }
}
