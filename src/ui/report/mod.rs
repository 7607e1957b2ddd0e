//! Text report of a sweep.
//!
//! The [`Reporter`] is the only component that writes scan output. It turns
//! [`ScanEvent`]s into report lines, filtered by the quiet and verbose
//! modes, and frames them with a run header and footer.

pub mod artifact;

use crate::core::error::{Error, Result};
use crate::core::types::Vulnerabilities;
use crate::scanner::results::{EventSink, ScanEvent, ScanStatistics};
use crate::utils::host::HostIdentity;
use chrono::{DateTime, Local};
use std::io::{self, Write};
use std::time::Instant;

pub use artifact::{log_file_name, open_log_file, resolve_log_path};

/// Timestamp format of the run header and footer.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f %:z";

/// Writes report lines for one run.
pub struct Reporter<W: Write> {
    out: W,
    err: Option<Box<dyn Write + Send>>,
    quiet: bool,
    verbose: bool,
    stats: ScanStatistics,
    started: Option<(DateTime<Local>, Instant)>,
    write_error: Option<io::Error>,
}

impl<W: Write> Reporter<W> {
    /// Create a reporter writing everything, errors included, to `out`.
    pub fn new(out: W, quiet: bool, verbose: bool) -> Self {
        Self {
            out,
            err: None,
            quiet,
            verbose,
            stats: ScanStatistics::new(),
            started: None,
            write_error: None,
        }
    }

    /// Send error lines to a separate stream.
    pub fn with_error_stream(mut self, err: Box<dyn Write + Send>) -> Self {
        self.err = Some(err);
        self
    }

    /// Write the run header.
    pub fn begin(&mut self, started: DateTime<Local>, active: Vulnerabilities) -> Result<()> {
        self.started = Some((started, Instant::now()));
        writeln!(self.out, "StartTime of scan: {}", started.format(TIMESTAMP_FORMAT))?;
        writeln!(self.out, "Checking for vulnerabilities: {}", active)?;
        Ok(())
    }

    /// Write the run footer and return the run's statistics.
    pub fn finish(&mut self, host: &HostIdentity) -> Result<ScanStatistics> {
        let ended = Local::now();
        let elapsed = self
            .started
            .map(|(_, instant)| instant.elapsed())
            .unwrap_or_default();

        writeln!(self.out, "EndTime of scan: {}", ended.format(TIMESTAMP_FORMAT))?;
        writeln!(
            self.out,
            "scanning of {} ({}) took {:.3?}",
            host.hostname, host.ip, elapsed
        )?;
        writeln!(self.out, "Summary: {}", self.stats)?;
        self.out.flush()?;
        if let Some(err) = self.err.as_mut() {
            err.flush()?;
        }

        if let Some(e) = self.write_error.take() {
            return Err(Error::Io(format!("Failed to write report: {}", e)));
        }
        Ok(self.stats.clone())
    }

    /// Statistics accumulated so far.
    pub fn statistics(&self) -> &ScanStatistics {
        &self.stats
    }

    /// Consume the reporter, returning the report writer.
    pub fn into_writer(self) -> W {
        self.out
    }

    /// Report line for an event, if the current mode shows it.
    fn render(&self, event: &ScanEvent) -> Option<String> {
        match event {
            ScanEvent::Examining { path } if !self.quiet => {
                Some(format!("examining {}", path.display()))
            }
            ScanEvent::Skipped { path, reason } if !self.quiet => {
                Some(format!("Skipping {}: {}", path, reason))
            }
            ScanEvent::Inspecting { archive, .. } if self.verbose => {
                Some(format!("Inspecting {}...", archive))
            }
            ScanEvent::ShortMember { archive, member } if !self.quiet => Some(format!(
                "skipping short JAR file member: {} ({})",
                archive, member
            )),
            ScanEvent::Match(finding) => Some(finding.to_string()),
            ScanEvent::Error(err) => Some(format!("error: {}", err.chain())),
            _ => None,
        }
    }

    fn write_line(&mut self, line: &str, is_error: bool) {
        let result = match self.err.as_mut() {
            Some(err) if is_error => writeln!(err, "{}", line),
            _ => writeln!(self.out, "{}", line),
        };
        if let Err(e) = result {
            if self.write_error.is_none() {
                log::warn!("Failed to write report line: {}", e);
                self.write_error = Some(e);
            }
        }
    }
}

impl<W: Write> EventSink for Reporter<W> {
    fn emit(&mut self, event: ScanEvent) {
        self.stats.record(&event);
        if let Some(line) = self.render(&event) {
            self.write_line(&line, matches!(event, ScanEvent::Error(_)));
        }
    }
}
