//! Configuration management for jarsweep.
//!
//! A run is described by two values built once at startup: [`ScanConfig`]
//! (everything the traversal needs) and [`OutputConfig`] (where the report
//! goes and what happens to it afterwards). Both are assembled from the
//! command line, optionally layered over a JSON [`ConfigFile`].

use crate::core::error::{Error, Result};
use crate::core::types::Vulnerabilities;
use crate::scanner::exclusion::{clean_path, ExclusionPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default maximum archive nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Default limit for a single buffered archive member (512 MB).
pub const DEFAULT_MAX_MEMBER_BYTES: u64 = 512 * 1024 * 1024;

/// Computes the active vulnerability mask for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VulnerabilityPolicy {
    /// Vulnerabilities the operator asked to ignore
    pub ignored: Vulnerabilities,
    /// Default-ignored vulnerabilities the operator asked to check anyway
    pub reincluded: Vulnerabilities,
    /// Ignore log4j 1.x (CVE-2019-17571)
    pub ignore_v1: bool,
}

impl VulnerabilityPolicy {
    /// The set of vulnerabilities excluded from this run.
    pub fn excluded(&self) -> Vulnerabilities {
        let mut excluded = self.ignored | Vulnerabilities::DEFAULT_IGNORED.without(self.reincluded);
        if self.ignore_v1 {
            excluded |= Vulnerabilities::CVE_2019_17571;
        }
        excluded
    }

    /// All known vulnerabilities minus the excluded ones.
    pub fn active_mask(&self) -> Vulnerabilities {
        Vulnerabilities::ALL.without(self.excluded())
    }
}

/// Immutable traversal configuration shared by the walker and the inspector.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root paths, cleaned, in the order given
    pub roots: Vec<PathBuf>,
    /// Paths pruned from traversal
    pub exclusions: ExclusionPolicy,
    /// Whether to descend into network filesystems
    pub scan_network: bool,
    /// Suppress everything but findings and errors
    pub quiet: bool,
    /// Log every archive considered
    pub verbose: bool,
    /// Active vulnerability mask, fixed for the run
    pub vulnerabilities: Vulnerabilities,
    /// Maximum archive nesting depth (outermost archive is depth 0)
    pub max_depth: usize,
    /// Maximum size of a single archive member read into memory
    pub max_member_bytes: u64,
}

impl ScanConfig {
    /// Create a configuration for the given roots with default settings.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            roots: roots.into_iter().map(|r| clean_path(r.as_ref())).collect(),
            exclusions: ExclusionPolicy::new(),
            scan_network: false,
            quiet: true,
            verbose: false,
            vulnerabilities: VulnerabilityPolicy::default().active_mask(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_member_bytes: DEFAULT_MAX_MEMBER_BYTES,
        }
    }

    /// Set the exclusion policy.
    pub fn with_exclusions(mut self, exclusions: ExclusionPolicy) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Enable or disable scanning of network filesystems.
    pub fn with_network(mut self, scan_network: bool) -> Self {
        self.scan_network = scan_network;
        self
    }

    /// Set quiet and verbose output modes.
    pub fn with_output_modes(mut self, quiet: bool, verbose: bool) -> Self {
        self.quiet = quiet;
        self.verbose = verbose;
        self
    }

    /// Set the active vulnerability mask from a policy.
    pub fn with_policy(mut self, policy: &VulnerabilityPolicy) -> Self {
        self.vulnerabilities = policy.active_mask();
        self
    }

    /// Set the maximum archive nesting depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the maximum buffered member size.
    pub fn with_max_member_bytes(mut self, bytes: u64) -> Self {
        self.max_member_bytes = bytes;
        self
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.roots.is_empty() {
            return Err(Error::NoScanRoots);
        }

        if self.max_depth == 0 {
            return Err(Error::config_invalid("max_depth", "Must be greater than 0"));
        }

        if self.max_member_bytes == 0 {
            return Err(Error::config_invalid(
                "max_member_mb",
                "Must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Where the report goes and what happens to it after the sweep.
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Explicit log file
    pub log_file: Option<PathBuf>,
    /// Generate a unique log file name from host identity and start time
    pub unique_log_name: bool,
    /// Upload the finished log here
    pub upload_url: Option<String>,
    /// Signature database to load instead of the default location
    pub signatures: Option<PathBuf>,
    /// Print upload diagnostics
    pub debug: bool,
}

/// A fully resolved run: traversal settings plus output settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub scan: ScanConfig,
    pub output: OutputConfig,
}

/// Optional JSON settings file. Every field is a default the CLI can override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Paths to exclude from traversal
    pub exclude: Vec<PathBuf>,
    /// Search network filesystems
    pub scan_network: Option<bool>,
    /// No output unless vulnerable
    pub quiet: Option<bool>,
    /// Log every archive file considered
    pub verbose: Option<bool>,
    /// Ignore log4j 1.x
    pub ignore_v1: Option<bool>,
    /// CVE identifiers to ignore
    pub ignore_vulns: Vec<String>,
    /// Default-ignored CVE identifiers to check anyway
    pub check_vulns: Vec<String>,
    /// Maximum archive nesting depth
    pub max_depth: Option<usize>,
    /// Maximum buffered member size in MB
    pub max_member_mb: Option<u64>,
    /// Log file to write output to
    pub log: Option<PathBuf>,
    /// Generate a unique log file name
    pub uniq_log_name: Option<bool>,
    /// URL to upload the log file to
    pub upload_url: Option<String>,
    /// Signature database path
    pub signatures: Option<PathBuf>,
}

impl ConfigFile {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigLoad(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            Error::ConfigLoad(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load the explicitly requested file, or the default one if it exists.
    ///
    /// An explicit path must exist; a missing default file yields empty settings.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let path = Self::default_path();
        if path.exists() {
            log::debug!("Loading settings from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the default settings file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jarsweep")
            .join("config.json")
    }

    /// Get the application data directory.
    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("jarsweep")
    }
}
