//! Utility functions and helpers.

pub mod hash;
pub mod host;
pub mod logging;
pub mod retry;

pub use hash::HashCalculator;
pub use host::HostIdentity;
pub use logging::{init_logging, LogConfig};
pub use retry::{retry_async, RetryConfig, Retryable};
