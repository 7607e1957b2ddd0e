//! Structured scan events and the statistics derived from them.
//!
//! The walker and the archive inspector never write output themselves. Every
//! decision (skip, match, error) becomes a [`ScanEvent`] handed to an
//! [`EventSink`]; the report writer is the only sink that produces text.

use crate::core::error::{Error, ErrorCategory};
use crate::core::types::Finding;
use crate::scanner::archive::ArchivePath;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Why a path or archive was not examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Path lives on a pseudo filesystem
    PseudoFilesystem,
    /// Path lives on a network filesystem and network scanning is off
    NetworkFilesystem,
    /// Path was excluded by the operator
    Excluded,
    /// Nested archive lies beyond the nesting depth limit
    DepthLimit,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PseudoFilesystem => write!(f, "pseudo filesystem"),
            SkipReason::NetworkFilesystem => write!(f, "network filesystem"),
            SkipReason::Excluded => write!(f, "explicitly excluded"),
            SkipReason::DepthLimit => write!(f, "nesting depth limit reached"),
        }
    }
}

/// One decision made during the sweep.
#[derive(Debug)]
pub enum ScanEvent {
    /// A filesystem path passed the pruning checks
    Examining { path: PathBuf },
    /// A subtree or nested archive was pruned
    Skipped { path: String, reason: SkipReason },
    /// An archive is about to be opened
    Inspecting { archive: ArchivePath, size: u64 },
    /// A member ended before the 4-byte magic number; benign
    ShortMember { archive: ArchivePath, member: String },
    /// The classifier recognized a vulnerable class file
    Match(Finding),
    /// A non-fatal error; the affected unit was skipped
    Error(Error),
}

/// Receives scan events in traversal order.
pub trait EventSink {
    fn emit(&mut self, event: ScanEvent);
}

impl EventSink for Vec<ScanEvent> {
    fn emit(&mut self, event: ScanEvent) {
        self.push(event);
    }
}

/// Counters accumulated from scan events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStatistics {
    /// Paths that passed pruning
    pub paths_examined: u64,
    /// Archives opened, nested ones included
    pub archives_inspected: u64,
    /// Pruned subtrees and nested archives
    pub skipped: u64,
    /// Members too short to carry a magic number
    pub short_members: u64,
    /// Vulnerable class files found
    pub findings: u64,
    /// Non-fatal errors
    pub errors: u64,
    /// Errors by category
    pub errors_by_category: BTreeMap<ErrorCategory, u64>,
}

impl ScanStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one event.
    pub fn record(&mut self, event: &ScanEvent) {
        match event {
            ScanEvent::Examining { .. } => self.paths_examined += 1,
            ScanEvent::Skipped { .. } => self.skipped += 1,
            ScanEvent::Inspecting { .. } => self.archives_inspected += 1,
            ScanEvent::ShortMember { .. } => self.short_members += 1,
            ScanEvent::Match(_) => self.findings += 1,
            ScanEvent::Error(err) => {
                self.errors += 1;
                *self.errors_by_category.entry(err.category()).or_insert(0) += 1;
            }
        }
    }
}

impl fmt::Display for ScanStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} archives inspected, {} findings, {} errors",
            self.archives_inspected, self.findings, self.errors
        )?;
        if !self.errors_by_category.is_empty() {
            let breakdown: Vec<String> = self
                .errors_by_category
                .iter()
                .map(|(category, count)| format!("{}: {}", category, count))
                .collect();
            write!(f, " ({})", breakdown.join(", "))?;
        }
        write!(f, ", {} skipped", self.skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{MatchResult, Vulnerabilities};

    #[test]
    fn test_statistics_record() {
        let mut stats = ScanStatistics::new();
        stats.record(&ScanEvent::Inspecting {
            archive: ArchivePath::new("app.jar"),
            size: 10,
        });
        stats.record(&ScanEvent::Match(Finding {
            archive: "app.jar".to_string(),
            member: "A.class".to_string(),
            result: MatchResult {
                filename: "A.class".to_string(),
                version: "2.0".to_string(),
                vulnerabilities: Vulnerabilities::CVE_2021_44228,
            },
        }));
        stats.record(&ScanEvent::Error(Error::file_open(
            "/x.jar",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        )));
        stats.record(&ScanEvent::Error(Error::archive_parse(
            "/y.jar",
            3,
            zip::result::ZipError::InvalidArchive("bad"),
        )));
        stats.record(&ScanEvent::Error(Error::file_open(
            "/z.jar",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        )));

        assert_eq!(stats.archives_inspected, 1);
        assert_eq!(stats.findings, 1);
        assert_eq!(stats.errors, 3);
        assert_eq!(stats.errors_by_category.get(&ErrorCategory::Io), Some(&2));
        assert_eq!(
            stats.to_string(),
            "1 archives inspected, 1 findings, 3 errors (I/O: 2, Archive: 1), 0 skipped"
        );
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::PseudoFilesystem.to_string(), "pseudo filesystem");
        assert_eq!(SkipReason::Excluded.to_string(), "explicitly excluded");
    }
}
