//! Member classification: archive kinds by extension, class files by magic bytes.

/// Java class-file magic number.
pub const CLASS_MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

/// Java archive kinds the sweep descends into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// Java archive
    Jar,
    /// Web application archive
    War,
    /// Enterprise application archive
    Ear,
}

impl ArchiveKind {
    /// Classify a file or member name by its extension (ASCII case-insensitive).
    ///
    /// Works on both filesystem paths and zip member names; only the final
    /// `/`-separated component is considered.
    pub fn from_name(name: &str) -> Option<Self> {
        match extension(name)?.to_ascii_lowercase().as_str() {
            "jar" => Some(ArchiveKind::Jar),
            "war" => Some(ArchiveKind::War),
            "ear" => Some(ArchiveKind::Ear),
            _ => None,
        }
    }
}

/// Extension of the last path component, without the dot.
///
/// A leading dot counts (`lib/.jar` has extension `jar`), matching how the
/// sweep treats dot-named archive members.
fn extension(name: &str) -> Option<&str> {
    let base = name
        .rsplit(|c: char| c == '/' || c == std::path::MAIN_SEPARATOR)
        .next()?;
    let dot = base.rfind('.')?;
    Some(&base[dot + 1..])
}

/// True if `bytes` starts with the class-file magic number.
pub fn is_class_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&CLASS_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_kind_detection() {
        assert_eq!(ArchiveKind::from_name("app.jar"), Some(ArchiveKind::Jar));
        assert_eq!(ArchiveKind::from_name("APP.WAR"), Some(ArchiveKind::War));
        assert_eq!(
            ArchiveKind::from_name("WEB-INF/lib/app.Ear"),
            Some(ArchiveKind::Ear)
        );
        assert_eq!(ArchiveKind::from_name("lib/.jar"), Some(ArchiveKind::Jar));
        assert_eq!(ArchiveKind::from_name("app.zip"), None);
        assert_eq!(ArchiveKind::from_name("jar"), None);
        assert_eq!(ArchiveKind::from_name("app.jar/Main.class"), None);
    }

    #[test]
    fn test_class_magic() {
        assert!(is_class_magic(b"\xca\xfe\xba\xbe\x00\x00\x00\x34"));
        assert!(!is_class_magic(b"PK\x03\x04"));
        assert!(!is_class_magic(b"\xca\xfe"));
    }
}
