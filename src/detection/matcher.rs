//! Signature classifier for class files.
//!
//! An exact hash match wins; otherwise the member path is checked against the
//! class rules and the bytes against their fix markers.

use crate::core::types::{MatchResult, Vulnerabilities};
use crate::detection::database::SignatureDatabase;
use crate::detection::VulnerabilityClassifier;
use crate::utils::hash::HashCalculator;
use std::sync::Arc;

/// Recognizes class files known to a signature database.
pub struct SignatureClassifier {
    db: Arc<SignatureDatabase>,
}

impl SignatureClassifier {
    /// Create a new classifier over a signature database.
    pub fn new(db: Arc<SignatureDatabase>) -> Self {
        Self { db }
    }

    /// Number of signatures available for matching.
    pub fn signature_count(&self) -> usize {
        self.db.len()
    }
}

impl SignatureClassifier {
    fn identify(&self, bytes: &[u8], member_name: &str) -> Option<MatchResult> {
        if self.db.hash_count() > 0 {
            let sha256 = HashCalculator::sha256_bytes(bytes);
            if let Some(sig) = self.db.lookup_sha256(&sha256) {
                return Some(MatchResult {
                    filename: sig.filename.clone(),
                    version: sig.version.clone(),
                    vulnerabilities: sig.vulnerabilities,
                });
            }
        }

        let rule = self.db.lookup_class(member_name)?;
        let (version, vulnerabilities) = rule.evaluate(bytes);
        Some(MatchResult {
            filename: rule.filename().to_string(),
            version: version.to_string(),
            vulnerabilities,
        })
    }
}

impl VulnerabilityClassifier for SignatureClassifier {
    fn classify(
        &self,
        bytes: &[u8],
        member_name: &str,
        active: Vulnerabilities,
    ) -> Option<MatchResult> {
        let found = self.identify(bytes, member_name)?;

        let vulnerabilities = found.vulnerabilities & active;
        if vulnerabilities.is_empty() {
            log::trace!(
                "{} matches {} {}, but none of its vulnerabilities are active",
                member_name,
                found.filename,
                found.version
            );
            return None;
        }

        Some(MatchResult {
            vulnerabilities,
            ..found
        })
    }
}
