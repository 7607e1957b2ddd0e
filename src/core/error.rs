//! Error types and result handling for jarsweep.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for jarsweep operations.
#[derive(Error, Debug)]
pub enum Error {
    // ===== I/O Errors =====
    #[error("can't open {path}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't seek in {path}")]
    FileSeek {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't read JAR file member: {archive} ({member})")]
    MemberRead {
        archive: String,
        member: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to create log file: {path}")]
    LogFileCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===== Archive Errors =====
    #[error("can't open JAR file: {archive} (size {size})")]
    ArchiveParse {
        archive: String,
        size: u64,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("can't open JAR file member for reading: {archive} (entry #{index})")]
    MemberOpen {
        archive: String,
        index: usize,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("JAR file member too large: {archive} ({member}): {size} bytes exceeds limit of {limit}")]
    MemberTooLarge {
        archive: String,
        member: String,
        size: u64,
        limit: u64,
    },

    // ===== Configuration Errors =====
    #[error("No path to scan! Please add at least one path to scan.")]
    NoScanRoots,

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Invalid configuration value: {field} - {message}")]
    ConfigInvalid { field: String, message: String },

    #[error("Unknown vulnerability identifier: {0}")]
    UnknownVulnerability(String),

    #[error("Failed to load signatures: {0}")]
    SignatureLoad(String),

    // ===== Network Errors =====
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Network request failed after {attempts} attempts: {operation}")]
    NetworkRetryExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    // ===== Generic Errors =====
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Create a file open error.
    pub fn file_open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileOpen {
            path: path.into(),
            source,
        }
    }

    /// Create a file seek error.
    pub fn file_seek(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSeek {
            path: path.into(),
            source,
        }
    }

    /// Create an archive member read error.
    pub fn member_read(
        archive: impl Into<String>,
        member: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::MemberRead {
            archive: archive.into(),
            member: member.into(),
            source,
        }
    }

    /// Create a structural archive error.
    pub fn archive_parse(
        archive: impl Into<String>,
        size: u64,
        source: zip::result::ZipError,
    ) -> Self {
        Self::ArchiveParse {
            archive: archive.into(),
            size,
            source,
        }
    }

    /// Create an invalid configuration error.
    pub fn config_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a network retry exhausted error.
    pub fn network_retry_exhausted(
        operation: impl Into<String>,
        attempts: u32,
        last_error: impl Into<String>,
    ) -> Self {
        Self::NetworkRetryExhausted {
            operation: operation.into(),
            attempts,
            last_error: last_error.into(),
        }
    }

    /// Render this error together with its chain of sources on one line.
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }

    /// Get a user-friendly suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::NoScanRoots => Some("Pass one or more directories, e.g.: jarsweep /opt /srv"),
            Error::ConfigLoad(_) | Error::ConfigInvalid { .. } => {
                Some("Check your configuration file for syntax errors or missing fields")
            }
            Error::UnknownVulnerability(_) => Some(
                "Known identifiers: CVE-2019-17571, CVE-2021-44228, CVE-2021-45046, CVE-2021-45105, CVE-2021-44832",
            ),
            Error::SignatureLoad(_) => {
                Some("Check that the signature file exists and holds a JSON signature list")
            }
            Error::LogFileCreate { .. } => {
                Some("Check that the log file directory exists and is writable")
            }
            Error::NetworkRetryExhausted { .. } => {
                Some("Check your network connection and the upload URL")
            }
            _ => None,
        }
    }

    /// Get the error category for summary counts.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::FileOpen { .. }
            | Error::FileSeek { .. }
            | Error::MemberRead { .. }
            | Error::Walk { .. }
            | Error::LogFileCreate { .. }
            | Error::Io(_) => ErrorCategory::Io,

            Error::ArchiveParse { .. }
            | Error::MemberOpen { .. }
            | Error::MemberTooLarge { .. } => ErrorCategory::Archive,

            Error::NoScanRoots
            | Error::ConfigLoad(_)
            | Error::ConfigInvalid { .. }
            | Error::UnknownVulnerability(_)
            | Error::SignatureLoad(_) => ErrorCategory::Configuration,

            Error::Upload(_) | Error::NetworkRetryExhausted { .. } => ErrorCategory::Network,

            Error::Internal(_) => ErrorCategory::Other,
        }
    }
}

/// Error category for classification and summary counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCategory {
    Io,
    Archive,
    Configuration,
    Network,
    Other,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io => write!(f, "I/O"),
            Self::Archive => write!(f, "Archive"),
            Self::Configuration => write!(f, "Configuration"),
            Self::Network => write!(f, "Network"),
            Self::Other => write!(f, "Other"),
        }
    }
}
