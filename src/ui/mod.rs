//! User interface components.
//!
//! This module provides:
//! - CLI interface
//! - Text report and log file handling

pub mod cli;
pub mod report;

pub use cli::Cli;
pub use report::Reporter;
