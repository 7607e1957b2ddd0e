//! Vulnerable class file detection.
//!
//! The archive inspector only knows the [`VulnerabilityClassifier`] contract.
//! [`SignatureClassifier`] implements it with a JSON signature table of known
//! vulnerable log4j classes: SHA-256 hashes of exact releases and class rules
//! with fix markers. A table is compiled into the binary.

pub mod database;
pub mod matcher;
pub mod signature;

use crate::core::types::{MatchResult, Vulnerabilities};

pub use database::SignatureDatabase;
pub use matcher::SignatureClassifier;
pub use signature::{ClassRule, FixMarker, Signature, SignatureFile};

/// Decides whether a class file belongs to a known vulnerable release.
pub trait VulnerabilityClassifier {
    /// Classify the full bytes of a class file.
    ///
    /// The returned vulnerabilities must be a non-empty subset of `active`.
    fn classify(
        &self,
        bytes: &[u8],
        member_name: &str,
        active: Vulnerabilities,
    ) -> Option<MatchResult>;
}
