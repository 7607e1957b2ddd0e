//! Recursive inspection of Java archives.
//!
//! An archive is opened from any seekable byte source. Members that are
//! archives themselves are buffered and inspected recursively; every other
//! member is sniffed for the class-file magic number and, on a hit, handed to
//! the [`VulnerabilityClassifier`].

use crate::core::config::ScanConfig;
use crate::core::error::Error;
use crate::core::types::{Finding, Vulnerabilities};
use crate::detection::VulnerabilityClassifier;
use crate::scanner::filetype::{is_class_magic, ArchiveKind, CLASS_MAGIC};
use crate::scanner::results::{EventSink, ScanEvent, SkipReason};
use std::fmt;
use std::io::{Cursor, ErrorKind, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Separator between nesting levels in a composite path.
pub const NESTING_SEPARATOR: &str = "::";

/// Upper bound on the buffer reserved up front for a member (1 MiB).
const MAX_INITIAL_CAPACITY: u64 = 1 << 20;

/// Composite path of a possibly nested archive.
///
/// The first segment is the filesystem path of the outermost archive; each
/// following segment is a member name inside the previous archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchivePath {
    segments: Vec<String>,
}

impl ArchivePath {
    /// Path of an outermost archive.
    pub fn new(outermost: impl Into<String>) -> Self {
        Self {
            segments: vec![outermost.into()],
        }
    }

    /// Path of an outermost archive on the filesystem.
    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy().into_owned())
    }

    /// Path of a member nested inside this archive.
    pub fn join(&self, member: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(member.to_string());
        Self { segments }
    }

    /// Number of archives enclosing this one.
    pub fn depth(&self) -> usize {
        self.segments.len() - 1
    }

    /// Filesystem path of the outermost archive.
    pub fn outermost(&self) -> &str {
        &self.segments[0]
    }
}

impl fmt::Display for ArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(NESTING_SEPARATOR))
    }
}

/// Opens archives, recurses into nested ones and classifies class files.
pub struct ArchiveInspector<'a> {
    classifier: &'a dyn VulnerabilityClassifier,
    active: Vulnerabilities,
    max_depth: usize,
    max_member_bytes: u64,
}

impl<'a> ArchiveInspector<'a> {
    /// Create an inspector for one run.
    pub fn new(config: &ScanConfig, classifier: &'a dyn VulnerabilityClassifier) -> Self {
        Self {
            classifier,
            active: config.vulnerabilities,
            max_depth: config.max_depth,
            max_member_bytes: config.max_member_bytes,
        }
    }

    /// Inspect one archive.
    ///
    /// `depth` is 0 for an archive found on the filesystem. All outcomes,
    /// errors included, are reported through `sink`; a failure inside one
    /// member never stops the remaining members from being inspected.
    pub fn inspect<R: Read + Seek>(
        &self,
        reader: R,
        size: u64,
        path: &ArchivePath,
        depth: usize,
        sink: &mut dyn EventSink,
    ) {
        sink.emit(ScanEvent::Inspecting {
            archive: path.clone(),
            size,
        });

        let mut archive = match ZipArchive::new(reader) {
            Ok(archive) => archive,
            Err(e) => {
                sink.emit(ScanEvent::Error(Error::archive_parse(path.to_string(), size, e)));
                return;
            }
        };

        for index in 0..archive.len() {
            let mut member = match archive.by_index(index) {
                Ok(member) => member,
                Err(e) => {
                    sink.emit(ScanEvent::Error(Error::MemberOpen {
                        archive: path.to_string(),
                        index,
                        source: e,
                    }));
                    continue;
                }
            };

            if member.is_dir() {
                continue;
            }

            let name = member.name().to_string();
            let declared = member.size();

            if ArchiveKind::from_name(&name).is_some() {
                let nested = path.join(&name);
                if depth + 1 > self.max_depth {
                    sink.emit(ScanEvent::Skipped {
                        path: nested.to_string(),
                        reason: SkipReason::DepthLimit,
                    });
                    continue;
                }

                match self.buffer_member(&mut member, declared, path, &name) {
                    Ok(buffer) => {
                        // Free the decompressor before recursing.
                        drop(member);
                        let len = buffer.len() as u64;
                        self.inspect(Cursor::new(buffer), len, &nested, depth + 1, sink);
                    }
                    Err(e) => sink.emit(ScanEvent::Error(e)),
                }
                continue;
            }

            let mut magic = [0u8; 4];
            match member.read_exact(&mut magic) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    sink.emit(ScanEvent::ShortMember {
                        archive: path.clone(),
                        member: name,
                    });
                    continue;
                }
                Err(e) => {
                    sink.emit(ScanEvent::Error(Error::member_read(path.to_string(), name, e)));
                    continue;
                }
            }

            if !is_class_magic(&magic) {
                continue;
            }

            let bytes = match self.read_class(&mut member, &magic, declared, path, &name) {
                Ok(bytes) => bytes,
                Err(e) => {
                    sink.emit(ScanEvent::Error(e));
                    continue;
                }
            };

            if let Some(result) = self.classifier.classify(&bytes, &name, self.active) {
                sink.emit(ScanEvent::Match(Finding {
                    archive: path.to_string(),
                    member: name,
                    result,
                }));
            }
        }
    }

    /// Read a nested archive member into memory, enforcing the size limit.
    fn buffer_member<R: Read>(
        &self,
        member: &mut R,
        declared: u64,
        archive: &ArchivePath,
        name: &str,
    ) -> Result<Vec<u8>, Error> {
        self.check_size(declared, archive, name)?;

        let mut buffer = Vec::with_capacity(initial_capacity(declared));
        member
            .take(self.max_member_bytes + 1)
            .read_to_end(&mut buffer)
            .map_err(|e| Error::member_read(archive.to_string(), name, e))?;

        // The declared size may understate the real content.
        self.check_size(buffer.len() as u64, archive, name)?;
        Ok(buffer)
    }

    /// Read the remainder of a class member whose magic was already consumed.
    fn read_class<R: Read>(
        &self,
        member: &mut R,
        magic: &[u8; 4],
        declared: u64,
        archive: &ArchivePath,
        name: &str,
    ) -> Result<Vec<u8>, Error> {
        self.check_size(declared, archive, name)?;

        let mut bytes = Vec::with_capacity(initial_capacity(declared));
        bytes.extend_from_slice(magic);
        member
            .take(self.max_member_bytes + 1 - CLASS_MAGIC.len() as u64)
            .read_to_end(&mut bytes)
            .map_err(|e| Error::member_read(archive.to_string(), name, e))?;

        self.check_size(bytes.len() as u64, archive, name)?;
        Ok(bytes)
    }

    fn check_size(&self, size: u64, archive: &ArchivePath, name: &str) -> Result<(), Error> {
        if size > self.max_member_bytes {
            return Err(Error::MemberTooLarge {
                archive: archive.to_string(),
                member: name.to_string(),
                size,
                limit: self.max_member_bytes,
            });
        }
        Ok(())
    }
}

/// Capacity to reserve for a member; the declared size comes from the
/// archive itself and is not trusted beyond a small bound.
fn initial_capacity(declared: u64) -> usize {
    declared.min(MAX_INITIAL_CAPACITY) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MatchResult;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    /// Matches any class whose body contains `VULN`.
    struct MarkerClassifier;

    impl VulnerabilityClassifier for MarkerClassifier {
        fn classify(
            &self,
            bytes: &[u8],
            member_name: &str,
            active: Vulnerabilities,
        ) -> Option<MatchResult> {
            let vulnerabilities = Vulnerabilities::CVE_2021_44228 & active;
            if vulnerabilities.is_empty() || !bytes.windows(4).any(|w| w == b"VULN") {
                return None;
            }
            Some(MatchResult {
                filename: member_name.rsplit('/').next().unwrap_or(member_name).to_string(),
                version: "2.14.1".to_string(),
                vulnerabilities,
            })
        }
    }

    /// Classifier that fails the test if called.
    struct NeverCalled;

    impl VulnerabilityClassifier for NeverCalled {
        fn classify(&self, _: &[u8], member_name: &str, _: Vulnerabilities) -> Option<MatchResult> {
            panic!("classifier called for {member_name}");
        }
    }

    fn class_bytes(body: &[u8]) -> Vec<u8> {
        let mut bytes = CLASS_MAGIC.to_vec();
        bytes.extend_from_slice(body);
        bytes
    }

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, FileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, FileOptions::default()).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn run(
        classifier: &dyn VulnerabilityClassifier,
        config: &ScanConfig,
        data: Vec<u8>,
    ) -> Vec<ScanEvent> {
        let inspector = ArchiveInspector::new(config, classifier);
        let mut events = Vec::new();
        let size = data.len() as u64;
        inspector.inspect(Cursor::new(data), size, &ArchivePath::new("outer.jar"), 0, &mut events);
        events
    }

    fn findings(events: &[ScanEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Match(f) => Some(f.member_path()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_archive_path_display() {
        let path = ArchivePath::new("/opt/app.ear")
            .join("lib/app.war")
            .join("WEB-INF/lib/core.jar");
        assert_eq!(path.to_string(), "/opt/app.ear::lib/app.war::WEB-INF/lib/core.jar");
        assert_eq!(path.depth(), 2);
        assert_eq!(path.outermost(), "/opt/app.ear");
    }

    #[test]
    fn test_nested_archive_match() {
        let vulnerable = class_bytes(b"VULN");
        let inner = build_zip(&[("Vulnerable.class", &vulnerable)]);
        let outer = build_zip(&[("META-INF/", b""), ("inner.jar", &inner)]);

        let events = run(&MarkerClassifier, &ScanConfig::new(["/"]), outer);

        assert_eq!(findings(&events), vec!["outer.jar::inner.jar::Vulnerable.class"]);
        let inspected = events
            .iter()
            .filter(|e| matches!(e, ScanEvent::Inspecting { .. }))
            .count();
        assert_eq!(inspected, 2);
    }

    #[test]
    fn test_every_match_is_reported() {
        let vulnerable = class_bytes(b"VULN");
        let outer = build_zip(&[
            ("a/JndiLookup.class", &vulnerable),
            ("b/Clean.class", &class_bytes(b"clean")),
            ("c/JndiManager.class", &vulnerable),
        ]);

        let events = run(&MarkerClassifier, &ScanConfig::new(["/"]), outer);
        assert_eq!(
            findings(&events),
            vec!["outer.jar::a/JndiLookup.class", "outer.jar::c/JndiManager.class"]
        );
    }

    #[test]
    fn test_magic_decides_not_extension() {
        let outer = build_zip(&[
            ("Fake.class", b"PK\x03\x04VULN"),
            ("README", b"plain text"),
        ]);

        let events = run(&NeverCalled, &ScanConfig::new(["/"]), outer);
        assert!(findings(&events).is_empty());
        assert!(!events.iter().any(|e| matches!(e, ScanEvent::Error(_))));
    }

    #[test]
    fn test_class_without_extension_is_classified() {
        let outer = build_zip(&[("blob.bin", &class_bytes(b"VULN"))]);
        let events = run(&MarkerClassifier, &ScanConfig::new(["/"]), outer);
        assert_eq!(findings(&events), vec!["outer.jar::blob.bin"]);
    }

    #[test]
    fn test_short_member_is_benign() {
        let outer = build_zip(&[("empty", b""), ("two", b"\xCA\xFE")]);

        let events = run(&NeverCalled, &ScanConfig::new(["/"]), outer);
        let short: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::ShortMember { member, .. } => Some(member.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(short, vec!["empty", "two"]);
        assert!(!events.iter().any(|e| matches!(e, ScanEvent::Error(_))));
    }

    #[test]
    fn test_invalid_archive_is_one_error() {
        let events = run(&NeverCalled, &ScanConfig::new(["/"]), b"not a zip file".to_vec());

        let errors: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Error(err) => Some(err.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(errors, vec!["can't open JAR file: outer.jar (size 14)"]);
    }

    #[test]
    fn test_invalid_nested_archive_does_not_stop_siblings() {
        let outer = build_zip(&[
            ("broken.jar", b"garbage"),
            ("Vulnerable.class", &class_bytes(b"VULN")),
        ]);

        let events = run(&MarkerClassifier, &ScanConfig::new(["/"]), outer);
        assert_eq!(findings(&events), vec!["outer.jar::Vulnerable.class"]);
        let errors = events.iter().filter(|e| matches!(e, ScanEvent::Error(_))).count();
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_declared_size_does_not_drive_allocation() {
        assert_eq!(initial_capacity(0), 0);
        assert_eq!(initial_capacity(4096), 4096);
        assert_eq!(initial_capacity(512 * 1024 * 1024), 1 << 20);
        assert_eq!(initial_capacity(u64::MAX), 1 << 20);
    }

    #[test]
    fn test_depth_limit() {
        let innermost = build_zip(&[("Vulnerable.class", &class_bytes(b"VULN"))]);
        let middle = build_zip(&[("innermost.jar", &innermost)]);
        let outer = build_zip(&[("middle.jar", &middle)]);

        let config = ScanConfig::new(["/"]).with_max_depth(1);
        let events = run(&MarkerClassifier, &config, outer);

        assert!(findings(&events).is_empty());
        assert!(events.iter().any(|e| matches!(
            e,
            ScanEvent::Skipped { path, reason: SkipReason::DepthLimit }
                if path == "outer.jar::middle.jar::innermost.jar"
        )));
    }

    #[test]
    fn test_member_size_limit() {
        let big = class_bytes(&[b'x'; 64]);
        let outer = build_zip(&[("Big.class", &big), ("Small.class", &class_bytes(b"VULN"))]);

        let config = ScanConfig::new(["/"]).with_max_member_bytes(32);
        let events = run(&MarkerClassifier, &config, outer);

        assert_eq!(findings(&events), vec!["outer.jar::Small.class"]);
        assert!(events.iter().any(|e| matches!(
            e,
            ScanEvent::Error(Error::MemberTooLarge { member, .. }) if member == "Big.class"
        )));
    }

    #[test]
    fn test_inactive_vulnerability_is_not_reported() {
        let outer = build_zip(&[("Vulnerable.class", &class_bytes(b"VULN"))]);
        let policy = crate::core::config::VulnerabilityPolicy {
            ignored: Vulnerabilities::CVE_2021_44228,
            ..Default::default()
        };
        let config = ScanConfig::new(["/"]).with_policy(&policy);

        let events = run(&MarkerClassifier, &config, outer);
        assert!(findings(&events).is_empty());
    }
}
