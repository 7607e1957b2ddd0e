//! Filesystem traversal.
//!
//! Walks every root depth-first, prunes pseudo filesystems, network
//! filesystems (unless enabled) and excluded paths, and hands every file with
//! an archive extension to the [`ArchiveInspector`].

use crate::core::config::ScanConfig;
use crate::core::error::Error;
use crate::scanner::archive::{ArchiveInspector, ArchivePath};
use crate::scanner::filetype::ArchiveKind;
use crate::scanner::mount::MountClassifier;
use crate::scanner::results::{EventSink, ScanEvent, SkipReason};
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Counters for one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories entered
    pub directories: u64,
    /// Non-directory entries examined
    pub files: u64,
    /// Files handed to the archive inspector
    pub archives: u64,
    /// Walk, open and seek failures
    pub errors: u64,
    /// Pruned paths
    pub skipped: u64,
}

impl WalkStats {
    fn merge(&mut self, other: WalkStats) {
        self.directories += other.directories;
        self.files += other.files;
        self.archives += other.archives;
        self.errors += other.errors;
        self.skipped += other.skipped;
    }
}

/// Depth-first walker over the configured roots.
pub struct TreeWalker<'a> {
    config: &'a ScanConfig,
    mounts: &'a dyn MountClassifier,
    inspector: ArchiveInspector<'a>,
}

impl<'a> TreeWalker<'a> {
    /// Create a walker.
    pub fn new(
        config: &'a ScanConfig,
        mounts: &'a dyn MountClassifier,
        inspector: ArchiveInspector<'a>,
    ) -> Self {
        Self {
            config,
            mounts,
            inspector,
        }
    }

    /// Walk every root in order.
    pub fn walk(&self, sink: &mut dyn EventSink) -> WalkStats {
        let mut stats = WalkStats::default();
        for root in &self.config.roots {
            let mut root_stats = WalkStats::default();
            self.walk_root(root, sink, &mut root_stats);
            log::debug!(
                "Walked {}: {} directories, {} files, {} archives, {} skipped, {} errors",
                root.display(),
                root_stats.directories,
                root_stats.files,
                root_stats.archives,
                root_stats.skipped,
                root_stats.errors
            );
            stats.merge(root_stats);
        }
        stats
    }

    /// Walk a single root.
    pub fn walk_root(&self, root: &Path, sink: &mut dyn EventSink, stats: &mut WalkStats) {
        let mut walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    if self.config.exclusions.covers(&path) {
                        log::trace!("Dropping walk error under excluded {}", path.display());
                        continue;
                    }
                    stats.errors += 1;
                    sink.emit(ScanEvent::Error(Error::Walk { path, source: e }));
                    continue;
                }
            };

            let is_dir = entry.file_type().is_dir();

            if let Some(reason) = self.prune_reason(entry.path()) {
                stats.skipped += 1;
                sink.emit(ScanEvent::Skipped {
                    path: entry.path().display().to_string(),
                    reason,
                });
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            sink.emit(ScanEvent::Examining {
                path: entry.path().to_path_buf(),
            });

            if is_dir {
                stats.directories += 1;
                continue;
            }

            stats.files += 1;
            if !Self::is_archive_candidate(&entry) {
                continue;
            }

            stats.archives += 1;
            if let Err(e) = self.scan_file(entry.path(), sink) {
                stats.errors += 1;
                sink.emit(ScanEvent::Error(e));
            }
        }
    }

    /// Why `path` must not be examined, checked in pruning order.
    fn prune_reason(&self, path: &Path) -> Option<SkipReason> {
        if self.mounts.is_pseudo_fs(path) {
            return Some(SkipReason::PseudoFilesystem);
        }
        if !self.config.scan_network && self.mounts.is_network_fs(path) {
            return Some(SkipReason::NetworkFilesystem);
        }
        if self.config.exclusions.contains(path) {
            return Some(SkipReason::Excluded);
        }
        None
    }

    /// Regular files, or symlinks to them, with a Java archive extension.
    fn is_archive_candidate(entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if ArchiveKind::from_name(&name).is_none() {
            return false;
        }
        if entry.path_is_symlink() {
            return std::fs::metadata(entry.path()).is_ok_and(|m| m.is_file());
        }
        entry.file_type().is_file()
    }

    /// Open an archive on disk and inspect it.
    fn scan_file(&self, path: &Path, sink: &mut dyn EventSink) -> Result<(), Error> {
        let mut file = File::open(path).map_err(|e| Error::file_open(path, e))?;
        let size = file
            .seek(SeekFrom::End(0))
            .map_err(|e| Error::file_seek(path, e))?;

        // The zip reader seeks as it needs; no rewind required.
        self.inspector
            .inspect(file, size, &ArchivePath::from_path(path), 0, sink);
        Ok(())
    }
}
