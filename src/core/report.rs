//! Run report
//!
//! An ordered log of what happened to every transfer unit, in walk order,
//! plus the subtrees the walk could not enumerate.

use crate::core::{TransferUnit, WalkFailure};
use crate::remote::EntryKind;
use chrono::{DateTime, Utc};
use console::style;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// What happened to one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    /// Directory created
    Created,
    /// Directory was already present
    Existing,
    /// File transferred
    Copied {
        /// Bytes written
        bytes: u64,
    },
    /// Destination file already existed
    Skipped,
    /// Entry type that is never transferred
    Ignored,
    /// Transfer failed
    Failed {
        /// Error message
        error: String,
    },
    /// Not started because the run was cancelled
    NotAttempted,
    /// Dry run: would be transferred
    Planned,
}

impl UnitStatus {
    /// Check if this status counts as a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One line of the ordered result log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitOutcome {
    /// The unit
    #[serde(flatten)]
    pub unit: TransferUnit,
    /// Its outcome
    #[serde(flatten)]
    pub status: UnitStatus,
}

/// Result of a sync run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Traversal root
    pub source: PathBuf,
    /// Local destination base
    pub destination: PathBuf,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Total duration
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    /// Outcomes in walk order
    pub outcomes: Vec<UnitOutcome>,
    /// Entries or subtrees the walk left out
    pub walk_failures: Vec<WalkFailure>,
    /// Run was interrupted
    pub cancelled: bool,
    /// Nothing was written
    pub dry_run: bool,
}

impl SyncReport {
    /// Check if every unit and the whole walk succeeded
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self.walk_failures.is_empty()
            && !self.outcomes.iter().any(|o| o.status.is_failure())
    }

    /// Failed units
    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failure())
    }

    /// Number of failed units plus walk failures
    pub fn failure_count(&self) -> usize {
        self.failures().count() + self.walk_failures.len()
    }

    /// Files transferred
    pub fn files_copied(&self) -> u64 {
        self.count(|s| matches!(s, UnitStatus::Copied { .. }))
    }

    /// Files left alone because they already existed
    pub fn files_skipped(&self) -> u64 {
        self.count(|s| matches!(s, UnitStatus::Skipped))
    }

    /// Directories created
    pub fn dirs_created(&self) -> u64 {
        self.count(|s| matches!(s, UnitStatus::Created))
    }

    /// Directories that were already present
    pub fn dirs_existing(&self) -> u64 {
        self.count(|s| matches!(s, UnitStatus::Existing))
    }

    /// Entries of ignored types
    pub fn ignored(&self) -> u64 {
        self.count(|s| matches!(s, UnitStatus::Ignored))
    }

    /// Total bytes written
    pub fn bytes_copied(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                UnitStatus::Copied { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&UnitStatus) -> bool) -> u64 {
        self.outcomes.iter().filter(|o| pred(&o.status)).count() as u64
    }

    /// Average throughput in bytes/second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.bytes_copied() as f64 / secs
        } else {
            0.0
        }
    }

    /// Write the line-oriented report keyed by remote path.
    ///
    /// Dry runs list every planned unit; real runs list only problems.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for outcome in &self.outcomes {
            let path = outcome.unit.remote_path.display();
            match &outcome.status {
                UnitStatus::Failed { error } => {
                    writeln!(out, "{} {}: {}", style("FAILED ").red().bold(), path, error)?
                }
                UnitStatus::Planned => writeln!(
                    out,
                    "{:<7} {} -> {}",
                    outcome.unit.kind.label(),
                    path,
                    outcome.unit.dest_path.display()
                )?,
                UnitStatus::NotAttempted if outcome.unit.kind != EntryKind::Other => {
                    writeln!(out, "{} {}", style("PENDING").yellow(), path)?
                }
                _ => {}
            }
        }

        for failure in &self.walk_failures {
            writeln!(
                out,
                "{} {}: {}",
                style("UNREAD ").red().bold(),
                failure.path.display(),
                failure.message
            )?;
        }

        writeln!(out)?;
        writeln!(out, "=== Sync Summary ===")?;
        writeln!(out, "Source:          {}", self.source.display())?;
        writeln!(out, "Destination:     {}", self.destination.display())?;
        writeln!(
            out,
            "Directories:     {} created, {} existing",
            self.dirs_created(),
            self.dirs_existing()
        )?;
        writeln!(out, "Files copied:    {}", self.files_copied())?;
        writeln!(out, "Files skipped:   {}", self.files_skipped())?;
        writeln!(out, "Ignored entries: {}", self.ignored())?;
        writeln!(
            out,
            "Bytes copied:    {}",
            humansize::format_size(self.bytes_copied(), humansize::BINARY)
        )?;
        writeln!(out, "Duration:        {:.2?}", self.duration)?;
        writeln!(
            out,
            "Throughput:      {}/s",
            humansize::format_size(self.throughput() as u64, humansize::BINARY)
        )?;

        if self.cancelled {
            writeln!(out, "\n{}", style("Run was cancelled before completion").yellow())?;
        }
        if self.failure_count() > 0 {
            writeln!(out, "\nFailures: {}", self.failure_count())?;
        }

        Ok(())
    }

    /// Print the text report to stdout
    pub fn print_summary(&self) {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        if let Err(e) = self.write_text(&mut lock) {
            tracing::error!("Failed to write report: {}", e);
        }
    }

    /// Serialize the full report as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(path: &str, kind: EntryKind, status: UnitStatus) -> UnitOutcome {
        UnitOutcome {
            unit: TransferUnit {
                remote_path: PathBuf::from(path),
                dest_path: PathBuf::from("/out").join(path.trim_start_matches('/')),
                kind,
                size: 0,
                permissions: 0o644,
            },
            status,
        }
    }

    fn report(outcomes: Vec<UnitOutcome>) -> SyncReport {
        SyncReport {
            source: PathBuf::from("/r"),
            destination: PathBuf::from("/out"),
            started_at: Utc::now(),
            duration: Duration::from_secs(2),
            outcomes,
            walk_failures: Vec::new(),
            cancelled: false,
            dry_run: false,
        }
    }

    #[test]
    fn test_counts() {
        let report = report(vec![
            outcome("/r", EntryKind::Directory, UnitStatus::Created),
            outcome("/r/a", EntryKind::RegularFile, UnitStatus::Copied { bytes: 100 }),
            outcome("/r/b", EntryKind::RegularFile, UnitStatus::Skipped),
            outcome("/r/c", EntryKind::Other, UnitStatus::Ignored),
            outcome(
                "/r/d",
                EntryKind::RegularFile,
                UnitStatus::Failed { error: "boom".to_string() },
            ),
        ]);

        assert_eq!(report.dirs_created(), 1);
        assert_eq!(report.files_copied(), 1);
        assert_eq!(report.files_skipped(), 1);
        assert_eq!(report.ignored(), 1);
        assert_eq!(report.bytes_copied(), 100);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.throughput(), 50.0);
        assert!(!report.is_success());
    }

    #[test]
    fn test_walk_failure_fails_run() {
        let mut report = report(vec![outcome("/r", EntryKind::Directory, UnitStatus::Created)]);
        assert!(report.is_success());

        report.walk_failures.push(WalkFailure {
            path: PathBuf::from("/r/locked"),
            message: "Permission denied".to_string(),
        });
        assert!(!report.is_success());
    }

    #[test]
    fn test_text_report_is_keyed_by_remote_path() {
        let report = report(vec![
            outcome("/r/ok", EntryKind::RegularFile, UnitStatus::Copied { bytes: 1 }),
            outcome(
                "/r/bad",
                EntryKind::RegularFile,
                UnitStatus::Failed { error: "read failed".to_string() },
            ),
        ]);

        let mut out = Vec::new();
        report.write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("/r/bad: read failed"));
        assert!(!text.contains("/r/ok:"));
        assert!(text.contains("Files copied:    1"));
    }

    #[test]
    fn test_json_report() {
        let report = report(vec![outcome(
            "/r/a",
            EntryKind::RegularFile,
            UnitStatus::Copied { bytes: 7 },
        )]);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["outcomes"][0]["status"], "copied");
        assert_eq!(json["outcomes"][0]["bytes"], 7);
        assert_eq!(json["outcomes"][0]["remote_path"], "/r/a");
        assert_eq!(json["duration"], 2.0);
    }
}
