//! Packages and their versions as the feed reports them.

use chrono::{DateTime, Utc};

use super::FeedVersion;

/// One version of a package as the feed describes it.
///
/// Plain data: selection state and change notification belong to whoever
/// presents these values.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageVersion {
    pub version: FeedVersion,
    /// Feed-defined: some feeds call this "unlisted", others "delisted".
    pub listed: bool,
    pub published: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub download_count: Option<u64>,
}

impl PackageVersion {
    pub fn new(version: FeedVersion) -> Self {
        Self {
            version,
            listed: true,
            published: None,
            description: None,
            authors: Vec::new(),
            download_count: None,
        }
    }

    pub fn is_prerelease(&self) -> bool {
        self.version.is_prerelease()
    }
}

/// What happened when a version was removed from a [`Package`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed { remaining: usize },
    /// The removed version was the last one; dropping the package from any
    /// visible set is up to the caller.
    PackageNowEmpty,
    NotPresent,
}

/// A package and its versions, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub id: String,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub total_downloads: Option<u64>,
    versions: Vec<PackageVersion>,
}

impl Package {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            authors: Vec::new(),
            total_downloads: None,
            versions: Vec::new(),
        }
    }

    pub fn with_versions(mut self, versions: Vec<PackageVersion>) -> Self {
        self.set_versions(versions);
        self
    }

    /// Package ids compare case-insensitively.
    pub fn has_id(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id)
    }

    pub fn versions(&self) -> &[PackageVersion] {
        &self.versions
    }

    pub fn latest(&self) -> Option<&PackageVersion> {
        self.versions.first()
    }

    pub fn version(&self, version: &FeedVersion) -> Option<&PackageVersion> {
        self.versions.iter().find(|v| &v.version == version)
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Replaces the owned versions, restoring newest-first order and dropping
    /// repeated identities (first occurrence kept).
    pub fn set_versions(&mut self, mut versions: Vec<PackageVersion>) {
        sort_newest_first(&mut versions);
        self.versions = versions;
    }

    /// Removes exactly one version, leaving the others untouched.
    pub fn remove_version(&mut self, version: &FeedVersion) -> RemovalOutcome {
        let Some(index) = self.versions.iter().position(|v| &v.version == version) else {
            return RemovalOutcome::NotPresent;
        };
        self.versions.remove(index);
        if self.versions.is_empty() {
            RemovalOutcome::PackageNowEmpty
        } else {
            RemovalOutcome::Removed {
                remaining: self.versions.len(),
            }
        }
    }
}

/// Stable descending sort followed by removal of adjacent duplicates, so the
/// first-seen entry for each identity survives.
pub(crate) fn sort_newest_first(versions: &mut Vec<PackageVersion>) {
    versions.sort_by(|a, b| b.version.cmp(&a.version));
    versions.dedup_by(|later, earlier| later.version == earlier.version);
}
