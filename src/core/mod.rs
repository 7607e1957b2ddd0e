//! Core module containing fundamental types, configuration, and error handling.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigFile, OutputConfig, ScanConfig, Settings, VulnerabilityPolicy};
pub use error::{Error, ErrorCategory, Result};
pub use types::{Finding, MatchResult, Vulnerabilities};
