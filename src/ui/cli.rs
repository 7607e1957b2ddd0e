//! Command-line interface definition.

use crate::core::config::{ConfigFile, OutputConfig, ScanConfig, Settings, VulnerabilityPolicy};
use crate::core::error::{Error, Result};
use crate::core::types::Vulnerabilities;
use crate::scanner::exclusion::ExclusionPolicy;
use clap::Parser;
use std::path::PathBuf;

/// jarsweep: a local scanner for vulnerable log4j components in Java archives
#[derive(Parser, Debug)]
#[command(name = "jarsweep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Paths to scan
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Path to exclude (can be used multiple times)
    #[arg(long, value_name = "PATH")]
    pub exclude: Vec<PathBuf>,

    /// Log every archive file considered
    #[arg(short, long)]
    pub verbose: bool,

    /// No output unless vulnerable [default: true]
    #[arg(
        short,
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub quiet: Option<bool>,

    /// Print diagnostics and upload responses
    #[arg(long)]
    pub debug: bool,

    /// Log file to write output to
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Generate a unique name for the log file [default: true]
    #[arg(
        long,
        alias = "uniqlogname",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub uniq_log_name: Option<bool>,

    /// URL to upload the log file to
    #[arg(long, alias = "uploadURL", value_name = "URL")]
    pub upload_url: Option<String>,

    /// Ignore log4j 1.x versions
    #[arg(long)]
    pub ignore_v1: bool,

    /// Vulnerabilities to ignore (comma separated, can be used multiple times)
    #[arg(long, value_name = "CVE")]
    pub ignore_vulns: Vec<String>,

    /// Default-ignored vulnerabilities to check anyway
    #[arg(long, value_name = "CVE")]
    pub check_vulns: Vec<String>,

    /// Search network filesystems
    #[arg(long)]
    pub scan_network: bool,

    /// Signature database to use
    #[arg(long, value_name = "FILE")]
    pub signatures: Option<PathBuf>,

    /// Settings file to load
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum archive nesting depth
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Maximum size of a single archive member in MB
    #[arg(long, value_name = "MB")]
    pub max_member_mb: Option<u64>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Effective quiet mode; defaults to quiet.
    pub fn is_quiet(&self, file: &ConfigFile) -> bool {
        self.quiet.or(file.quiet).unwrap_or(true)
    }

    /// Combine the command line with a settings file. Flags win.
    pub fn resolve(&self, file: ConfigFile) -> Result<Settings> {
        let exclusions: ExclusionPolicy = file.exclude.iter().chain(&self.exclude).collect();

        let policy = VulnerabilityPolicy {
            ignored: parse_all(file.ignore_vulns.iter().chain(&self.ignore_vulns))?,
            reincluded: parse_all(file.check_vulns.iter().chain(&self.check_vulns))?,
            ignore_v1: self.ignore_v1 || file.ignore_v1.unwrap_or(false),
        };

        let mut scan = ScanConfig::new(&self.paths)
            .with_exclusions(exclusions)
            .with_network(self.scan_network || file.scan_network.unwrap_or(false))
            .with_output_modes(
                self.is_quiet(&file),
                self.verbose || file.verbose.unwrap_or(false),
            )
            .with_policy(&policy);

        if let Some(depth) = self.max_depth.or(file.max_depth) {
            scan = scan.with_max_depth(depth);
        }
        if let Some(mb) = self.max_member_mb.or(file.max_member_mb) {
            let bytes = mb
                .checked_mul(1024 * 1024)
                .ok_or_else(|| Error::config_invalid("max_member_mb", "Value too large"))?;
            scan = scan.with_max_member_bytes(bytes);
        }
        scan.validate()?;

        let output = OutputConfig {
            log_file: self.log.clone().or(file.log),
            unique_log_name: self.uniq_log_name.or(file.uniq_log_name).unwrap_or(true),
            upload_url: self.upload_url.clone().or(file.upload_url),
            signatures: self.signatures.clone().or(file.signatures),
            debug: self.debug,
        };

        Ok(Settings { scan, output })
    }
}

fn parse_all<'a>(lists: impl Iterator<Item = &'a String>) -> Result<Vulnerabilities> {
    let mut set = Vulnerabilities::NONE;
    for list in lists {
        set |= Vulnerabilities::parse_list(list)?;
    }
    Ok(set)
}
