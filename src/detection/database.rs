//! In-memory signature index: hash signatures keyed by SHA-256, plus class rules.

use crate::core::config::ConfigFile;
use crate::core::error::Result;
use crate::detection::signature::{ClassRule, Signature, SignatureFile};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default signature filename inside the data directory.
const DEFAULT_SIGNATURES: &str = "signatures.json";

/// Enabled signatures indexed by lowercase SHA-256, and enabled class rules.
#[derive(Debug, Clone, Default)]
pub struct SignatureDatabase {
    by_sha256: HashMap<String, Signature>,
    rules: Vec<ClassRule>,
    version: Option<String>,
}

impl SignatureDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a database from a parsed signature file.
    pub fn from_file(file: SignatureFile) -> Self {
        let mut db = Self {
            by_sha256: HashMap::with_capacity(file.signatures.len()),
            rules: file.rules.into_iter().filter(|r| r.enabled).collect(),
            version: Some(file.version),
        };
        for sig in file.signatures.into_iter().filter(|s| s.enabled) {
            db.insert(sig);
        }
        db
    }

    /// The table compiled into the binary.
    pub fn builtin() -> Result<Self> {
        Ok(Self::from_file(SignatureFile::builtin()?))
    }

    /// Load a signature file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Self::from_file(SignatureFile::load(path)?);
        log::debug!(
            "Loaded {} signatures from {} (version {})",
            db.len(),
            path.display(),
            db.version().unwrap_or("unknown")
        );
        Ok(db)
    }

    /// Open the default signature database.
    ///
    /// A signature file in the data directory replaces the built-in table.
    pub fn open_default() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            log::debug!(
                "No signature database at {}; using the built-in table",
                path.display()
            );
            return Self::builtin();
        }
        Self::open(&path)
    }

    /// Get the default signature database path.
    pub fn default_path() -> PathBuf {
        ConfigFile::data_dir().join(DEFAULT_SIGNATURES)
    }

    /// Add a signature, replacing any with the same hash.
    pub fn insert(&mut self, sig: Signature) {
        let key = sig.sha256.to_lowercase();
        if let Some(previous) = self.by_sha256.insert(key, sig) {
            log::debug!(
                "Duplicate signature for {} {} replaced",
                previous.filename,
                previous.version
            );
        }
    }

    /// Look up a signature by SHA-256 hex digest.
    pub fn lookup_sha256(&self, sha256: &str) -> Option<&Signature> {
        self.by_sha256.get(&sha256.to_lowercase())
    }

    /// First class rule matching an archive member path.
    pub fn lookup_class(&self, member: &str) -> Option<&ClassRule> {
        self.rules.iter().find(|rule| rule.matches_member(member))
    }

    /// Number of hash signatures.
    pub fn hash_count(&self) -> usize {
        self.by_sha256.len()
    }

    /// Version string of the loaded signature file.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn len(&self) -> usize {
        self.by_sha256.len() + self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sha256.is_empty() && self.rules.is_empty()
    }
}
