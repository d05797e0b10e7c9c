//! Parsed, orderable package versions.
//!
//! Feeds hand out version strings such as `1.0`, `2.1.0-beta.2` or
//! `4.0.0.1+sha.abc`. A [`FeedVersion`] keeps the text it was parsed from for
//! display and for building request URLs, while equality, hashing and ordering
//! only look at the numeric release components and the prerelease label.

use semver::Prerelease;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of numeric release components (`major.minor.patch.revision`).
const MAX_RELEASE_COMPONENTS: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("empty version string")]
    Empty,
    #[error("invalid version '{0}': expected at most four numeric components")]
    TooManyComponents(String),
    #[error("invalid version '{version}': component '{component}' is not a number")]
    InvalidComponent { version: String, component: String },
    #[error("invalid version '{version}': bad prerelease label: {reason}")]
    InvalidPrerelease { version: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct FeedVersion {
    release: [u64; MAX_RELEASE_COMPONENTS],
    pre: Prerelease,
    original: String,
}

impl FeedVersion {
    pub fn parse(text: &str) -> Result<Self, VersionParseError> {
        text.parse()
    }

    pub fn major(&self) -> u64 {
        self.release[0]
    }

    pub fn minor(&self) -> u64 {
        self.release[1]
    }

    pub fn patch(&self) -> u64 {
        self.release[2]
    }

    /// Whether a prerelease label is present.
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// The prerelease label, lowercased; empty for releases.
    pub fn prerelease(&self) -> &str {
        self.pre.as_str()
    }

    /// The text this version was parsed from (trimmed).
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Canonical form: at least three components, the fourth only when non-zero,
    /// lowercased prerelease label, no build metadata.
    pub fn normalized(&self) -> String {
        let [major, minor, patch, revision] = self.release;
        let mut text = format!("{}.{}.{}", major, minor, patch);
        if revision != 0 {
            text.push_str(&format!(".{}", revision));
        }
        if self.is_prerelease() {
            text.push('-');
            text.push_str(self.pre.as_str());
        }
        text
    }
}

impl FromStr for FeedVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(VersionParseError::Empty);
        }

        // Build metadata never takes part in identity or precedence.
        let without_build = match text.split_once('+') {
            Some((head, _)) => head,
            None => text,
        };

        let (release_part, pre_part) = match without_build.split_once('-') {
            Some((release, pre)) => (release, Some(pre)),
            None => (without_build, None),
        };

        let components: Vec<&str> = release_part.split('.').collect();
        if components.len() > MAX_RELEASE_COMPONENTS {
            return Err(VersionParseError::TooManyComponents(text.to_string()));
        }

        let mut release = [0u64; MAX_RELEASE_COMPONENTS];
        for (slot, component) in release.iter_mut().zip(&components) {
            *slot = component
                .parse()
                .map_err(|_| VersionParseError::InvalidComponent {
                    version: text.to_string(),
                    component: component.to_string(),
                })?;
        }

        let pre = match pre_part {
            None => Prerelease::EMPTY,
            Some(label) => {
                // Labels compare case-insensitively on feeds.
                Prerelease::new(&label.to_ascii_lowercase()).map_err(|e| {
                    VersionParseError::InvalidPrerelease {
                        version: text.to_string(),
                        reason: e.to_string(),
                    }
                })?
            }
        };

        if pre_part.is_some() && pre.is_empty() {
            return Err(VersionParseError::InvalidPrerelease {
                version: text.to_string(),
                reason: "empty label".to_string(),
            });
        }

        Ok(Self {
            release,
            pre,
            original: text.to_string(),
        })
    }
}

impl fmt::Display for FeedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for FeedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release
            .cmp(&other.release)
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                // A release outranks any prerelease of the same numbers.
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for FeedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FeedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FeedVersion {}

impl Hash for FeedVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.release.hash(state);
        self.pre.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> FeedVersion {
        text.parse().unwrap()
    }

    fn sorted_desc(inputs: &[&str]) -> Vec<String> {
        let mut versions: Vec<FeedVersion> = inputs.iter().map(|s| v(s)).collect();
        versions.sort_by(|a, b| b.cmp(a));
        versions.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_three_components() {
        let version = v("1.2.3");
        assert_eq!(version.major(), 1);
        assert_eq!(version.minor(), 2);
        assert_eq!(version.patch(), 3);
        assert!(!version.is_prerelease());
        assert_eq!(version.as_str(), "1.2.3");
    }

    #[test]
    fn test_parse_short_and_long_forms() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1"), v("1.0.0.0"));
        assert!(v("1.0.0.1") > v("1.0.0"));
        assert_eq!(v("1.0.0.1").normalized(), "1.0.0.1");
        assert_eq!(v("1.0").normalized(), "1.0.0");
    }

    #[test]
    fn test_parse_prerelease_and_build() {
        let version = v("2.0.0-Beta.2+sha.5114f85");
        assert!(version.is_prerelease());
        assert_eq!(version.prerelease(), "beta.2");
        assert_eq!(version.to_string(), "2.0.0-Beta.2+sha.5114f85");
        assert_eq!(version.normalized(), "2.0.0-beta.2");
        assert_eq!(version, v("2.0.0-beta.2"));
        assert_eq!(v("1.0.0+build.1"), v("1.0.0+build.2"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(FeedVersion::parse(""), Err(VersionParseError::Empty));
        assert_eq!(FeedVersion::parse("   "), Err(VersionParseError::Empty));
        assert!(matches!(
            FeedVersion::parse("1.2.3.4.5"),
            Err(VersionParseError::TooManyComponents(_))
        ));
        assert!(matches!(
            FeedVersion::parse("1.x.0"),
            Err(VersionParseError::InvalidComponent { .. })
        ));
        assert!(matches!(
            FeedVersion::parse("1.0.0-"),
            Err(VersionParseError::InvalidPrerelease { .. })
        ));
        assert!(matches!(
            FeedVersion::parse("1.0.0-beta..1"),
            Err(VersionParseError::InvalidPrerelease { .. })
        ));
    }

    #[test]
    fn test_descending_order_mixed() {
        assert_eq!(
            sorted_desc(&["1.0.0", "2.0.0-beta", "1.1.0", "2.0.0"]),
            vec!["2.0.0", "2.0.0-beta", "1.1.0", "1.0.0"]
        );
    }

    #[test]
    fn test_numeric_components_compare_numerically() {
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("10.0.0") > v("9.99.99"));
    }

    #[test]
    fn test_prerelease_precedence() {
        // Example chain from the semantic versioning rules.
        let ascending = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
        ];
        for pair in ascending.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_prerelease_case_insensitive() {
        assert_eq!(v("1.0.0-RC.1"), v("1.0.0-rc.1"));
        assert!(v("1.0.0-Alpha") < v("1.0.0-beta"));
    }

    #[test]
    fn test_hash_matches_equality() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(v("1.0"));
        assert!(set.contains(&v("1.0.0")));
        assert!(set.contains(&v("1.0.0+meta")));
        assert!(!set.contains(&v("1.0.0-pre")));
    }
}
