//! Core type definitions used throughout jarsweep.

use crate::core::error::{Error, Result};
use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

static KNOWN: [(Vulnerabilities, &str); 5] = [
    (Vulnerabilities::CVE_2019_17571, "CVE-2019-17571"),
    (Vulnerabilities::CVE_2021_44228, "CVE-2021-44228"),
    (Vulnerabilities::CVE_2021_45046, "CVE-2021-45046"),
    (Vulnerabilities::CVE_2021_45105, "CVE-2021-45105"),
    (Vulnerabilities::CVE_2021_44832, "CVE-2021-44832"),
];

/// Set of known log4j vulnerabilities, stored as a bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vulnerabilities(u32);

impl Vulnerabilities {
    /// The empty set.
    pub const NONE: Self = Self(0);
    /// log4j 1.x SocketServer deserialization.
    pub const CVE_2019_17571: Self = Self(1 << 0);
    /// Log4Shell JNDI lookup.
    pub const CVE_2021_44228: Self = Self(1 << 1);
    /// Incomplete fix for CVE-2021-44228 (non-default pattern layouts).
    pub const CVE_2021_45046: Self = Self(1 << 2);
    /// Uncontrolled recursion in lookup evaluation.
    pub const CVE_2021_45105: Self = Self(1 << 3);
    /// JDBC appender remote code execution (attacker-controlled configuration).
    pub const CVE_2021_44832: Self = Self(1 << 4);
    /// Every vulnerability this crate knows about.
    pub const ALL: Self = Self(0b1_1111);
    /// Vulnerabilities that need a non-default log4j configuration to exploit.
    pub const DEFAULT_IGNORED: Self = Self(Self::CVE_2021_45046.0 | Self::CVE_2021_44832.0);

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if every vulnerability in `other` is also in `self`.
    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set difference.
    pub fn without(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Iterate over the CVE identifiers in this set, in a fixed order.
    pub fn identifiers(&self) -> impl Iterator<Item = &'static str> + '_ {
        KNOWN
            .iter()
            .filter(move |(vuln, _)| self.contains(*vuln))
            .map(|(_, id)| *id)
    }

    /// Parse a single CVE identifier or a comma separated list of them.
    ///
    /// `none` parses to the empty set, `all` to [`Vulnerabilities::ALL`].
    pub fn parse_list(value: &str) -> Result<Self> {
        let mut set = Self::NONE;
        for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            set |= token.parse::<Self>()?;
        }
        Ok(set)
    }
}

impl FromStr for Vulnerabilities {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("none") {
            return Ok(Self::NONE);
        }
        if token.eq_ignore_ascii_case("all") {
            return Ok(Self::ALL);
        }
        KNOWN
            .iter()
            .find(|(_, id)| id.eq_ignore_ascii_case(token))
            .map(|(vuln, _)| *vuln)
            .ok_or_else(|| Error::UnknownVulnerability(token.to_string()))
    }
}

impl BitOr for Vulnerabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Vulnerabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Vulnerabilities {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for Vulnerabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let ids: Vec<&str> = self.identifiers().collect();
        write!(f, "{}", ids.join(", "))
    }
}

impl Serialize for Vulnerabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let ids: Vec<&str> = self.identifiers().collect();
        let mut seq = serializer.serialize_seq(Some(ids.len()))?;
        for id in ids {
            seq.serialize_element(id)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Vulnerabilities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let ids = Vec::<String>::deserialize(deserializer)?;
        let mut set = Self::NONE;
        for id in &ids {
            set |= id.parse::<Self>().map_err(serde::de::Error::custom)?;
        }
        Ok(set)
    }
}

/// What a classifier reports for a class file it recognizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Identity of the vulnerable component (e.g. `JndiManager.class`)
    pub filename: String,
    /// Detected log4j release
    pub version: String,
    /// Vulnerabilities that apply, restricted to the active set
    pub vulnerabilities: Vulnerabilities,
}

/// A classifier match located inside an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Composite path of the archive holding the member
    pub archive: String,
    /// Member name inside that archive
    pub member: String,
    pub result: MatchResult,
}

impl Finding {
    /// Composite path of the matched member itself.
    pub fn member_path(&self) -> String {
        format!("{}::{}", self.archive, self.member)
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "indicator for vulnerable component found in {} ({}): {} {} {}",
            self.archive,
            self.member,
            self.result.filename,
            self.result.version,
            self.result.vulnerabilities
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_operations() {
        let set = Vulnerabilities::CVE_2021_44228 | Vulnerabilities::CVE_2021_45105;
        assert!(set.contains(Vulnerabilities::CVE_2021_44228));
        assert!(!set.contains(Vulnerabilities::CVE_2019_17571));

        let reduced = set.without(Vulnerabilities::CVE_2021_44228);
        assert_eq!(reduced, Vulnerabilities::CVE_2021_45105);

        assert_eq!(set & Vulnerabilities::CVE_2021_45105, Vulnerabilities::CVE_2021_45105);
        assert!((set & Vulnerabilities::CVE_2019_17571).is_empty());
    }

    #[test]
    fn test_all_contains_every_known() {
        for id in Vulnerabilities::ALL.identifiers() {
            let vuln: Vulnerabilities = id.parse().unwrap();
            assert!(Vulnerabilities::ALL.contains(vuln));
        }
        assert_eq!(Vulnerabilities::ALL.identifiers().count(), 5);
    }

    #[test]
    fn test_parse_list() {
        let set = Vulnerabilities::parse_list("cve-2021-44228, CVE-2019-17571").unwrap();
        assert_eq!(
            set,
            Vulnerabilities::CVE_2021_44228 | Vulnerabilities::CVE_2019_17571
        );
        assert_eq!(Vulnerabilities::parse_list("none").unwrap(), Vulnerabilities::NONE);
        assert!(matches!(
            Vulnerabilities::parse_list("CVE-2000-0001"),
            Err(Error::UnknownVulnerability(_))
        ));
    }

    #[test]
    fn test_display_order_is_stable() {
        let set = Vulnerabilities::CVE_2021_44832 | Vulnerabilities::CVE_2019_17571;
        assert_eq!(set.to_string(), "CVE-2019-17571, CVE-2021-44832");
        assert_eq!(Vulnerabilities::NONE.to_string(), "none");
    }

    #[test]
    fn test_serde_as_identifier_list() {
        let set = Vulnerabilities::CVE_2021_44228 | Vulnerabilities::CVE_2021_45046;
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["CVE-2021-44228","CVE-2021-45046"]"#);

        let back: Vulnerabilities = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);

        assert!(serde_json::from_str::<Vulnerabilities>(r#"["CVE-1999-0001"]"#).is_err());
    }

    #[test]
    fn test_finding_display() {
        let finding = Finding {
            archive: "app.war::WEB-INF/lib/log4j-core-2.14.1.jar".to_string(),
            member: "org/apache/logging/log4j/core/net/JndiManager.class".to_string(),
            result: MatchResult {
                filename: "JndiManager.class".to_string(),
                version: "2.14.1".to_string(),
                vulnerabilities: Vulnerabilities::CVE_2021_44228,
            },
        };
        assert_eq!(
            finding.to_string(),
            "indicator for vulnerable component found in app.war::WEB-INF/lib/log4j-core-2.14.1.jar \
             (org/apache/logging/log4j/core/net/JndiManager.class): JndiManager.class 2.14.1 CVE-2021-44228"
        );
        assert!(finding
            .member_path()
            .ends_with("::org/apache/logging/log4j/core/net/JndiManager.class"));
    }
}
