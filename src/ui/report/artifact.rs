//! Log file naming and creation.

use crate::core::config::OutputConfig;
use crate::core::error::{Error, Result};
use crate::utils::host::HostIdentity;
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Suffix of generated log file names.
const LOG_SUFFIX: &str = "log4j-vuln-scanner.log";

/// Unique log file name: `<ip>-<hostname>_<YYYYmmdd_HHMMSS>_log4j-vuln-scanner.log`.
pub fn log_file_name(host: &HostIdentity, started: &DateTime<Local>) -> String {
    format!(
        "{}-{}_{}_{}",
        host.ip,
        host.hostname,
        started.format("%Y%m%d_%H%M%S"),
        LOG_SUFFIX
    )
}

/// Where the report should be written, or `None` for stdout.
///
/// An explicit log file wins. Otherwise a unique name in the current
/// directory is generated when requested or when the log will be uploaded.
pub fn resolve_log_path(
    output: &OutputConfig,
    host: &HostIdentity,
    started: &DateTime<Local>,
) -> Option<PathBuf> {
    if let Some(path) = &output.log_file {
        return Some(path.clone());
    }
    if output.unique_log_name || output.upload_url.is_some() {
        return Some(PathBuf::from(log_file_name(host, started)));
    }
    None
}

/// Create (or truncate) the log file.
pub fn open_log_file(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).map_err(|e| Error::LogFileCreate {
        path: path.to_path_buf(),
        source: e,
    })?;
    log::debug!("Writing report to {}", path.display());
    Ok(BufWriter::new(file))
}
