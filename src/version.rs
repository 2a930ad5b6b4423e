//! Product version parsing and ordering.
//!
//! Versions are parsed from `"<major>.<minor>.<patch><suffix>"` strings and
//! ordered lexicographically over `(major, minor, patch, suffix)`. The suffix
//! compares as a plain string, so `9.1.39c < 9.1.39d` and a bare `9.1.39`
//! sorts before both.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{MigrateError, Result};

static RE_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)(.*)$").expect("version regex"));

static RE_START_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*#\s*VERSION\s+(\d+)\.(\d+)\.(\d+)").expect("marker regex"));

/// A product release version.
///
/// The derived `Ord` gives the field-by-field lexicographic ordering the
/// migration catalog relies on. [`ProductVersion::no_version`] is the `0.0.0`
/// sentinel that compares less than every parsed version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductVersion {
    major: u32,
    minor: u32,
    patch: u32,
    suffix: String,
}

impl ProductVersion {
    fn from_parts(major: u32, minor: u32, patch: u32, suffix: &str) -> Self {
        Self {
            major,
            minor,
            patch,
            suffix: suffix.to_string(),
        }
    }

    /// The `0.0.0` sentinel used when no prior version was recorded.
    pub fn no_version() -> Self {
        Self::from_parts(0, 0, 0, "")
    }

    /// Returns true for the [`ProductVersion::no_version`] sentinel.
    pub fn is_no_version(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.patch == 0 && self.suffix.is_empty()
    }

    /// Scan file content for a `# VERSION <major>.<minor>.<patch>` comment.
    ///
    /// The first marker wins. Files without a marker yield the
    /// [`ProductVersion::no_version`] sentinel.
    pub fn from_start_marker(content: &str) -> Self {
        match RE_START_MARKER.captures(content) {
            Some(caps) => Self::from_parts(
                caps[1].parse().unwrap_or(0),
                caps[2].parse().unwrap_or(0),
                caps[3].parse().unwrap_or(0),
                "",
            ),
            None => Self::no_version(),
        }
    }

    /// Read a version from the first line of a release file.
    ///
    /// The expected layout is `<program> <version> ...`; the second
    /// whitespace-separated field is parsed.
    pub fn from_release_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let first_line = content.lines().next().unwrap_or("");
        let version = first_line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| MigrateError::MalformedReleaseFile {
                path: path.to_path_buf(),
            })?;
        version.parse()
    }
}

impl FromStr for ProductVersion {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = RE_VERSION
            .captures(s)
            .ok_or_else(|| MigrateError::InvalidVersionFormat(s.to_string()))?;
        // The numeric groups only match digits; overflow is the one way left to fail.
        let number = |i: usize| {
            caps[i]
                .parse::<u32>()
                .map_err(|_| MigrateError::InvalidVersionFormat(s.to_string()))
        };
        Ok(Self::from_parts(
            number(1)?,
            number(2)?,
            number(3)?,
            &caps[4],
        ))
    }
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}{}",
            self.major, self.minor, self.patch, self.suffix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ProductVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display_round_trip() {
        assert_eq!(v("9.1.39").to_string(), "9.1.39");
        assert_eq!(v("10.5.31c").to_string(), "10.5.31c");
        assert_eq!(v("3.5.9-rc1").to_string(), "3.5.9-rc1");
    }

    #[test]
    fn test_malformed_versions_fail() {
        assert!("3.5".parse::<ProductVersion>().is_err());
        assert!("TEST".parse::<ProductVersion>().is_err());
        assert!("".parse::<ProductVersion>().is_err());
        assert!(".1.2.3".parse::<ProductVersion>().is_err());
    }

    #[test]
    fn test_ordering_chain() {
        let chain = ["3.5.9", "3.5.9c", "3.5.9d", "3.5.10", "3.11.9"];
        for pair in chain.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
        for s in chain {
            assert!(ProductVersion::no_version() < v(s));
        }
        assert_eq!(v("3.5.9"), v("3.5.9"));
        assert!(v("3.5.9") <= v("3.5.9"));
    }

    #[test]
    fn test_no_version_sentinel() {
        assert!(ProductVersion::no_version().is_no_version());
        assert!(!v("0.0.1").is_no_version());
        assert!(!v("0.0.0a").is_no_version());
        assert_eq!(ProductVersion::no_version(), v("0.0.0"));
    }

    #[test]
    fn test_start_marker_first_match_wins() {
        let content = "\
# some header
#  VERSION 9.1.76
key=value
# VERSION 10.2.8
";
        assert_eq!(ProductVersion::from_start_marker(content), v("9.1.76"));
    }

    #[test]
    fn test_start_marker_absent() {
        assert!(ProductVersion::from_start_marker("[globals]\na=1\n").is_no_version());
        // A marker buried in a key value does not count.
        assert!(ProductVersion::from_start_marker("note=# VERSION 1.2.3\n").is_no_version());
    }

    #[test]
    fn test_release_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("VERSION");
        std::fs::write(&path, "gateway 10.5.31c (build 1234)\nsecond line\n").unwrap();
        assert_eq!(ProductVersion::from_release_file(&path).unwrap(), v("10.5.31c"));

        std::fs::write(&path, "gateway\n").unwrap();
        assert!(ProductVersion::from_release_file(&path).is_err());
    }
}
