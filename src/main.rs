//! jarsweep: a local scanner for vulnerable log4j components.
//!
//! This is the main entry point for the CLI application.

use chrono::{DateTime, Local};
use jarsweep::core::config::{ConfigFile, ScanConfig, Settings};
use jarsweep::core::error::{Error, Result};
use jarsweep::detection::{SignatureClassifier, SignatureDatabase};
use jarsweep::scanner::{ArchiveInspector, ScanStatistics, StatfsMountClassifier, TreeWalker};
use jarsweep::ui::cli::Cli;
use jarsweep::ui::report::{open_log_file, resolve_log_path, Reporter};
use jarsweep::upload::LogUploader;
use jarsweep::utils::host::HostIdentity;
use jarsweep::utils::logging::{init_logging, LogConfig};
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.chain());
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let mut log_config = LogConfig::from_flags(cli.debug, cli.verbose);
    if !io::stderr().is_terminal() {
        log_config = log_config.without_color();
    }
    init_logging(log_config)?;

    let file = ConfigFile::load_or_default(cli.config.as_deref())?;
    let Settings { scan, output } = cli.resolve(file)?;

    let db = match &output.signatures {
        Some(path) => SignatureDatabase::open(path)?,
        None => SignatureDatabase::open_default()?,
    };
    let classifier = SignatureClassifier::new(Arc::new(db));
    log::info!("{} signatures loaded", classifier.signature_count());

    let host = HostIdentity::detect();
    let started = Local::now();
    let log_path = resolve_log_path(&output, &host, &started);
    let quiet = scan.quiet;

    if !quiet {
        println!(
            "{} - a simple local log4j vulnerability scanner\n",
            env!("CARGO_PKG_NAME")
        );
    }

    let stats = match &log_path {
        Some(path) => {
            let reporter = Reporter::new(open_log_file(path)?, scan.quiet, scan.verbose);
            sweep(scan, classifier, reporter, host, started).await?
        }
        None => {
            let reporter = Reporter::new(io::stdout(), scan.quiet, scan.verbose)
                .with_error_stream(Box::new(io::stderr()));
            sweep(scan, classifier, reporter, host, started).await?
        }
    };
    log::info!("Scan complete: {}", stats);

    if !quiet {
        println!("\nScan finished");
    }

    if let (Some(url), Some(path)) = (&output.upload_url, &log_path) {
        match LogUploader::new(url.as_str()).upload(path).await {
            Ok(receipt) => {
                if output.debug {
                    println!("Response StatusCode: {}", receipt.status);
                    println!("{}", receipt.body);
                }
                if !quiet {
                    println!("scanlog uploaded successfully to: {}", url);
                }
            }
            Err(e) => eprintln!("\nError while uploading logfile: {}", e.chain()),
        }
    }

    Ok(())
}

/// Run the traversal on a blocking thread, reporting through `reporter`.
async fn sweep<W>(
    scan: ScanConfig,
    classifier: SignatureClassifier,
    mut reporter: Reporter<W>,
    host: HostIdentity,
    started: DateTime<Local>,
) -> Result<ScanStatistics>
where
    W: Write + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mounts = StatfsMountClassifier::new();
        let inspector = ArchiveInspector::new(&scan, &classifier);
        let walker = TreeWalker::new(&scan, &mounts, inspector);

        reporter.begin(started, scan.vulnerabilities)?;
        let walked = walker.walk(&mut reporter);
        log::debug!(
            "{} directories, {} files, {} archives walked",
            walked.directories,
            walked.files,
            walked.archives
        );
        reporter.finish(&host)
    })
    .await
    .map_err(|e| Error::Internal(format!("Scan task failed: {}", e)))?
}
