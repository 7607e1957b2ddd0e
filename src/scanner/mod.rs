//! Filesystem sweep for vulnerable log4j classes.
//!
//! This module provides:
//! - Directory traversal with pseudo/network filesystem and exclusion pruning
//! - Recursive inspection of nested Java archives
//! - Class file detection via magic bytes
//! - Structured scan events and statistics

pub mod archive;
pub mod exclusion;
pub mod filetype;
pub mod mount;
pub mod results;
pub mod walker;

pub use archive::{ArchiveInspector, ArchivePath};
pub use exclusion::{clean_path, ExclusionPolicy};
pub use filetype::{ArchiveKind, CLASS_MAGIC};
pub use mount::{FixedMountClassifier, MountClassifier, StatfsMountClassifier};
pub use results::{EventSink, ScanEvent, ScanStatistics, SkipReason};
pub use walker::{TreeWalker, WalkStats};
