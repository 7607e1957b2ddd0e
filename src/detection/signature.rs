//! Signature file format for known-vulnerable class files.
//!
//! A signature file holds two kinds of entries. Hash signatures identify one
//! exact class file of one release. Class rules identify a class by its path
//! inside the archive and narrow the affected vulnerabilities by byte markers
//! that later releases introduced; they cover builds no hash list knows.

use crate::core::error::{Error, Result};
use crate::core::types::Vulnerabilities;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Signature table compiled into the binary.
const BUILTIN_SIGNATURES: &str = include_str!("../../data/signatures.json");

/// A known-vulnerable class file, identified by the SHA-256 of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Lowercase hex SHA-256 of the class file
    pub sha256: String,
    /// Class file name (e.g. "JndiManager.class")
    pub filename: String,
    /// log4j release the class belongs to
    pub version: String,
    /// Vulnerabilities affecting that release
    pub vulnerabilities: Vulnerabilities,
    /// Whether this signature is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Signature {
    /// Create a new signature.
    pub fn new(
        sha256: impl Into<String>,
        filename: impl Into<String>,
        version: impl Into<String>,
        vulnerabilities: Vulnerabilities,
    ) -> Self {
        Self {
            sha256: sha256.into().to_lowercase(),
            filename: filename.into(),
            version: version.into(),
            vulnerabilities,
            enabled: true,
        }
    }

    /// Check that the hash is 64 hex digits.
    pub fn validate(&self) -> Result<()> {
        let valid = self.sha256.len() == 64 && self.sha256.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(Error::SignatureLoad(format!(
                "invalid SHA-256 for {} {}: {:?}",
                self.filename, self.version, self.sha256
            )));
        }
        Ok(())
    }
}

/// A byte string whose presence shows that some vulnerabilities are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixMarker {
    pub marker: String,
    /// First release carrying the marker
    pub version: String,
    /// Vulnerabilities fixed by that release
    pub fixed: Vulnerabilities,
}

/// A vulnerable class recognized by its path inside an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRule {
    /// Class file path inside the archive,
    /// e.g. `org/apache/logging/log4j/core/net/JndiManager.class`
    pub class: String,
    /// Releases reported when no fix marker is present
    pub version: String,
    /// Vulnerabilities of those releases
    pub vulnerabilities: Vulnerabilities,
    /// Markers in ascending release order
    #[serde(default)]
    pub fixes: Vec<FixMarker>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ClassRule {
    /// Base name of the class file.
    pub fn filename(&self) -> &str {
        self.class.rsplit('/').next().unwrap_or(&self.class)
    }

    /// True if `member` is this class, possibly below a relocated package prefix.
    pub fn matches_member(&self, member: &str) -> bool {
        match member.strip_suffix(self.class.as_str()) {
            Some(prefix) => prefix.is_empty() || prefix.ends_with('/'),
            None => false,
        }
    }

    /// Release and remaining vulnerabilities of a class file's bytes.
    pub fn evaluate<'a>(&'a self, bytes: &[u8]) -> (&'a str, Vulnerabilities) {
        let mut version = self.version.as_str();
        let mut remaining = self.vulnerabilities;
        for fix in &self.fixes {
            if contains(bytes, fix.marker.as_bytes()) {
                version = fix.version.as_str();
                remaining = remaining.without(fix.fixed);
            }
        }
        (version, remaining)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.class.ends_with(".class") || self.class.starts_with('/') {
            return Err(Error::SignatureLoad(format!(
                "invalid class path in rule: {:?}",
                self.class
            )));
        }
        if self.vulnerabilities.is_empty() {
            return Err(Error::SignatureLoad(format!(
                "rule for {} lists no vulnerabilities",
                self.class
            )));
        }
        if let Some(fix) = self.fixes.iter().find(|f| f.marker.is_empty()) {
            return Err(Error::SignatureLoad(format!(
                "rule for {} has an empty marker for {}",
                self.class, fix.version
            )));
        }
        Ok(())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Signature database file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureFile {
    /// Database version (e.g., "2022.01.10")
    pub version: String,
    /// Database format version
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// Timestamp of last update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// List of signatures
    #[serde(default)]
    pub signatures: Vec<Signature>,
    /// Class rules, consulted when no hash matches
    #[serde(default)]
    pub rules: Vec<ClassRule>,
}

fn default_format_version() -> u32 {
    1
}

impl SignatureFile {
    /// Create a new empty signature file.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            format_version: 1,
            updated_at: Some(chrono::Utc::now().to_rfc3339()),
            signatures: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// The signature table shipped with jarsweep.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_SIGNATURES)
    }

    /// Parse signatures from JSON text.
    pub fn from_json(contents: &str) -> Result<Self> {
        let file: Self = serde_json::from_str(contents).map_err(|e| {
            Error::SignatureLoad(format!("Failed to parse signature file: {}", e))
        })?;
        for sig in &file.signatures {
            sig.validate()?;
        }
        for rule in &file.rules {
            rule.validate()?;
        }
        Ok(file)
    }

    /// Load signatures from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::SignatureLoad(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Add a signature.
    pub fn add(&mut self, sig: Signature) {
        self.signatures.push(sig);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "4f2c8a1e9b7d6c5a3e2f1d0c9b8a7f6e5d4c3b2a1f0e9d8c7b6a5f4e3d2c1b0a";

    #[test]
    fn test_signature_hash_match() {
        let sig = Signature::new(
            HASH.to_uppercase(),
            "JndiLookup.class",
            "2.14.1",
            Vulnerabilities::CVE_2021_44228,
        );

        assert_eq!(sig.sha256, HASH);
        assert!(sig.enabled);
        assert!(sig.validate().is_ok());
    }

    #[test]
    fn test_invalid_hash_rejected() {
        let sig = Signature::new("abc123", "JndiLookup.class", "2.0", Vulnerabilities::ALL);
        assert!(matches!(sig.validate(), Err(Error::SignatureLoad(_))));
    }

    #[test]
    fn test_signature_file_parsing() {
        let json = format!(
            r#"{{
                "version": "2022.01.10",
                "signatures": [
                    {{
                        "sha256": "{HASH}",
                        "filename": "JndiManager.class",
                        "version": "2.0-beta9",
                        "vulnerabilities": ["CVE-2021-44228", "CVE-2021-45046"]
                    }},
                    {{
                        "sha256": "{HASH}",
                        "filename": "SocketServer.class",
                        "version": "1.2.17",
                        "vulnerabilities": ["CVE-2019-17571"],
                        "enabled": false
                    }}
                ]
            }}"#
        );

        let file = SignatureFile::from_json(&json).unwrap();
        assert_eq!(file.format_version, 1);
        assert_eq!(file.signatures.len(), 2);
        assert!(file.rules.is_empty());
        assert!(!file.signatures[1].enabled);
        assert_eq!(
            file.signatures[0].vulnerabilities,
            Vulnerabilities::CVE_2021_44228 | Vulnerabilities::CVE_2021_45046
        );
    }

    fn jndi_manager_rule() -> ClassRule {
        ClassRule {
            class: "org/apache/logging/log4j/core/net/JndiManager.class".to_string(),
            version: "<2.15.0".to_string(),
            vulnerabilities: Vulnerabilities::CVE_2021_44228 | Vulnerabilities::CVE_2021_45046,
            fixes: vec![
                FixMarker {
                    marker: "LdapHosts".to_string(),
                    version: "2.15.0".to_string(),
                    fixed: Vulnerabilities::CVE_2021_44228,
                },
                FixMarker {
                    marker: "isJndiEnabled".to_string(),
                    version: "2.16.0".to_string(),
                    fixed: Vulnerabilities::CVE_2021_44228 | Vulnerabilities::CVE_2021_45046,
                },
            ],
            enabled: true,
        }
    }

    #[test]
    fn test_rule_member_matching() {
        let rule = jndi_manager_rule();
        assert_eq!(rule.filename(), "JndiManager.class");
        assert!(rule.matches_member("org/apache/logging/log4j/core/net/JndiManager.class"));
        assert!(rule.matches_member("shaded/org/apache/logging/log4j/core/net/JndiManager.class"));
        assert!(!rule.matches_member("xorg/apache/logging/log4j/core/net/JndiManager.class"));
        assert!(!rule.matches_member("JndiManager.class"));
    }

    #[test]
    fn test_rule_fix_markers_narrow_vulnerabilities() {
        let rule = jndi_manager_rule();

        let (version, vulns) = rule.evaluate(b"\xCA\xFE\xBA\xBElookup");
        assert_eq!(version, "<2.15.0");
        assert_eq!(vulns, rule.vulnerabilities);

        let (version, vulns) = rule.evaluate(b"\xCA\xFE\xBA\xBE..allowedLdapHosts..");
        assert_eq!(version, "2.15.0");
        assert_eq!(vulns, Vulnerabilities::CVE_2021_45046);

        let (version, vulns) = rule.evaluate(b"\xCA\xFE\xBA\xBELdapHosts isJndiEnabled");
        assert_eq!(version, "2.16.0");
        assert!(vulns.is_empty());
    }

    #[test]
    fn test_rule_validation() {
        let mut rule = jndi_manager_rule();
        assert!(rule.validate().is_ok());
        rule.fixes[0].marker.clear();
        assert!(rule.validate().is_err());

        let mut rule = jndi_manager_rule();
        rule.class = "JndiManager".to_string();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_builtin_table_loads() {
        let file = SignatureFile::builtin().unwrap();
        assert!(!file.rules.is_empty());
        assert!(file
            .rules
            .iter()
            .any(|r| r.filename() == "JndiManager.class"
                && r.vulnerabilities.contains(Vulnerabilities::CVE_2021_44228)));
        assert!(file
            .rules
            .iter()
            .any(|r| r.vulnerabilities.contains(Vulnerabilities::CVE_2019_17571)));
    }

    #[test]
    fn test_unknown_cve_rejected() {
        let json = format!(
            r#"{{ "version": "1", "signatures": [
                {{ "sha256": "{HASH}", "filename": "A.class", "version": "2.1",
                   "vulnerabilities": ["CVE-1999-0001"] }} ] }}"#
        );
        assert!(SignatureFile::from_json(&json).is_err());
    }
}
