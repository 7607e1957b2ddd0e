//! jarsweep: a local scanner for vulnerable log4j components
//!
//! This crate walks directory trees, opens Java archives (including archives
//! nested inside archives), identifies class files by their magic number and
//! classifies them against known vulnerable log4j releases. Findings are
//! written as a line-oriented report that can be uploaded to a collector.

pub mod core;
pub mod detection;
pub mod scanner;
pub mod ui;
pub mod upload;
pub mod utils;

// Re-export commonly used types
pub use crate::core::config::{ScanConfig, Settings};
pub use crate::core::error::{Error, Result};
pub use crate::core::types::*;
