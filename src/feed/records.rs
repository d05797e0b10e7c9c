//! Raw feed records and their normalization.
//!
//! Two producers feed one merge: search hits (lightweight, carry per-version
//! download counts) and registration metadata (carry description, authors,
//! listing state and publish time). Both become [`RawVersionRecord`]s, and
//! [`merge_records`] is the only place that dedupes and orders them.

use chrono::{DateTime, Datelike, Utc};
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;

use super::OneOrMany;
use crate::model::{FeedVersion, Package, PackageVersion, sort_newest_first};

/// Registration metadata marks unlisted versions with this publish year.
const UNLISTED_PUBLISH_YEAR: i32 = 1900;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordOrigin {
    Search,
    Metadata,
}

/// A version record before parsing and deduplication.
#[derive(Debug, Clone)]
pub(crate) struct RawVersionRecord {
    pub origin: RecordOrigin,
    pub version: String,
    pub listed: Option<bool>,
    pub published: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub download_count: Option<u64>,
}

impl RawVersionRecord {
    fn new(origin: RecordOrigin, version: impl Into<String>) -> Self {
        Self {
            origin,
            version: version.into(),
            listed: None,
            published: None,
            description: None,
            authors: Vec::new(),
            download_count: None,
        }
    }

    /// How many descriptive fields are populated.
    fn richness(&self) -> usize {
        let has_description = self
            .description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty());
        usize::from(has_description) + usize::from(!self.authors.is_empty())
    }

    /// Fills fields this record lacks from a record for the same version.
    fn fill_from(&mut self, other: RawVersionRecord) {
        if self.description.is_none() {
            self.description = other.description;
        }
        if self.authors.is_empty() {
            self.authors = other.authors;
        }
        if self.listed.is_none() {
            self.listed = other.listed;
        }
        if self.published.is_none() {
            self.published = other.published;
        }
        if self.download_count.is_none() {
            self.download_count = other.download_count;
        }
    }

    fn into_version(self, version: FeedVersion) -> PackageVersion {
        PackageVersion {
            version,
            listed: self.listed.unwrap_or(true),
            published: self.published,
            description: self.description,
            authors: self.authors,
            download_count: self.download_count,
        }
    }
}

/// Parses, dedupes and orders version records, newest first.
///
/// When two records share a version identity the one with more descriptive
/// metadata wins (ties keep the first seen), and gaps in the winner are filled
/// from the other. Records with unparsable versions are skipped.
pub(crate) fn merge_records<I>(records: I) -> Vec<PackageVersion>
where
    I: IntoIterator<Item = RawVersionRecord>,
{
    let mut merged: Vec<(FeedVersion, RawVersionRecord)> = Vec::new();
    let mut positions: HashMap<FeedVersion, usize> = HashMap::new();

    for record in records {
        let version = match FeedVersion::parse(&record.version) {
            Ok(version) => version,
            Err(e) => {
                warn!("Skipping {:?} record: {}", record.origin, e);
                continue;
            }
        };

        match positions.get(&version) {
            Some(&index) => {
                let existing = &mut merged[index].1;
                if record.richness() > existing.richness() {
                    let previous = std::mem::replace(existing, record);
                    existing.fill_from(previous);
                } else {
                    existing.fill_from(record);
                }
            }
            None => {
                positions.insert(version.clone(), merged.len());
                merged.push((version, record));
            }
        }
    }

    let mut versions: Vec<PackageVersion> = merged
        .into_iter()
        .map(|(version, record)| record.into_version(version))
        .collect();
    sort_newest_first(&mut versions);
    versions
}

// --- Search service shapes ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub total_hits: Option<u64>,
    #[serde(default)]
    pub data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchHit {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub authors: Option<OneOrMany>,
    #[serde(default)]
    pub total_downloads: Option<u64>,
    #[serde(default, alias = "isListed")]
    pub listed: Option<bool>,
    #[serde(default)]
    pub versions: Vec<HitVersion>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum HitVersion {
    Detailed {
        version: String,
        #[serde(default)]
        downloads: Option<u64>,
    },
    Bare(String),
}

impl SearchHit {
    pub(crate) fn version_records(&self) -> Vec<RawVersionRecord> {
        self.versions
            .iter()
            .map(|v| match v {
                HitVersion::Detailed { version, downloads } => {
                    let mut record = RawVersionRecord::new(RecordOrigin::Search, version);
                    record.download_count = *downloads;
                    record
                }
                HitVersion::Bare(version) => RawVersionRecord::new(RecordOrigin::Search, version),
            })
            .collect()
    }

    /// Package-level fields only; versions are attached by the caller.
    pub(crate) fn to_package(&self) -> Package {
        let mut package = Package::new(self.id.clone());
        package.description = self.description.clone();
        package.authors = self
            .authors
            .clone()
            .map(OneOrMany::into_list)
            .unwrap_or_default();
        package.total_downloads = self.total_downloads;
        package
    }
}

// --- Registration (metadata) shapes ---

#[derive(Debug, Deserialize)]
pub(crate) struct RegistrationIndex {
    #[serde(default)]
    items: Vec<RegistrationPage>,
}

#[derive(Debug, Deserialize)]
struct RegistrationPage {
    #[serde(rename = "@id", default)]
    id: Option<String>,
    #[serde(default)]
    items: Option<Vec<RegistrationLeaf>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationLeaf {
    catalog_entry: CatalogEntry,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    authors: Option<OneOrMany>,
    #[serde(default)]
    listed: Option<bool>,
    #[serde(default)]
    published: Option<String>,
}

impl RegistrationIndex {
    pub(crate) fn into_records(self) -> Vec<RawVersionRecord> {
        let mut records = Vec::new();
        for page in self.items {
            let Some(leaves) = page.items else {
                warn!(
                    "Registration page {} is not inlined; its versions are skipped",
                    page.id.as_deref().unwrap_or("(unnamed)")
                );
                continue;
            };
            records.extend(leaves.into_iter().map(|leaf| leaf.catalog_entry.into_record()));
        }
        records
    }
}

impl CatalogEntry {
    fn into_record(self) -> RawVersionRecord {
        let published = self.published.as_deref().and_then(parse_timestamp);
        let listed = self
            .listed
            .or_else(|| published.map(|p| p.year() != UNLISTED_PUBLISH_YEAR));

        let mut record = RawVersionRecord::new(RecordOrigin::Metadata, self.version);
        record.listed = listed;
        record.published = published;
        record.description = self.description.filter(|d| !d.trim().is_empty());
        record.authors = self.authors.map(OneOrMany::into_list).unwrap_or_default();
        record
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_record(version: &str, downloads: Option<u64>) -> RawVersionRecord {
        let mut record = RawVersionRecord::new(RecordOrigin::Search, version);
        record.download_count = downloads;
        record
    }

    fn metadata_record(version: &str, description: &str) -> RawVersionRecord {
        let mut record = RawVersionRecord::new(RecordOrigin::Metadata, version);
        record.description = Some(description.to_string());
        record.authors = vec!["Jane".to_string()];
        record.listed = Some(true);
        record
    }

    fn versions_of(versions: &[PackageVersion]) -> Vec<String> {
        versions.iter().map(|v| v.version.to_string()).collect()
    }

    #[test]
    fn test_merge_sorts_descending() {
        let merged = merge_records(
            ["1.0.0", "2.0.0-beta", "1.1.0", "2.0.0"]
                .into_iter()
                .map(|v| search_record(v, None)),
        );
        assert_eq!(
            versions_of(&merged),
            vec!["2.0.0", "2.0.0-beta", "1.1.0", "1.0.0"]
        );
    }

    #[test]
    fn test_merge_richer_record_wins_and_fills_gaps() {
        let merged = merge_records(vec![
            search_record("1.0.0", Some(42)),
            metadata_record("1.0.0", "from metadata"),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].description.as_deref(), Some("from metadata"));
        assert_eq!(merged[0].authors, vec!["Jane"]);
        assert_eq!(merged[0].download_count, Some(42));
    }

    #[test]
    fn test_merge_tie_keeps_first_seen() {
        let merged = merge_records(vec![
            metadata_record("1.0.0", "first"),
            metadata_record("1.0", "second"),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].description.as_deref(), Some("first"));
        assert_eq!(merged[0].version.to_string(), "1.0.0");
    }

    #[test]
    fn test_merge_skips_unparsable_versions() {
        let merged = merge_records(vec![
            search_record("not-a-version", None),
            search_record("1.0.0", None),
        ]);
        assert_eq!(versions_of(&merged), vec!["1.0.0"]);
    }

    #[test]
    fn test_merge_defaults_to_listed() {
        let merged = merge_records(vec![search_record("1.0.0", None)]);
        assert!(merged[0].listed);
    }

    #[test]
    fn test_search_hit_versions_accept_objects_and_strings() {
        let hit: SearchHit = serde_json::from_str(
            r#"{
                "id": "Example.Package",
                "description": "An example",
                "authors": ["Jane", "John"],
                "totalDownloads": 1234,
                "versions": [
                    {"version": "1.0.0", "downloads": 1000, "@id": "https://x/1.0.0.json"},
                    "1.1.0"
                ]
            }"#,
        )
        .unwrap();

        let records = hit.version_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].download_count, Some(1000));
        assert_eq!(records[1].version, "1.1.0");
        assert_eq!(records[1].download_count, None);

        let package = hit.to_package();
        assert_eq!(package.id, "Example.Package");
        assert_eq!(package.authors, vec!["Jane", "John"]);
        assert_eq!(package.total_downloads, Some(1234));
        assert!(package.is_empty());
    }

    #[test]
    fn test_registration_records() {
        let index: RegistrationIndex = serde_json::from_str(
            r#"{
                "count": 2,
                "items": [
                    {
                        "@id": "https://feed/reg/example/index.json#page/1.0.0/1.1.0",
                        "items": [
                            {"catalogEntry": {
                                "version": "1.0.0",
                                "description": "First",
                                "authors": "Jane, John",
                                "listed": true,
                                "published": "2024-01-02T03:04:05Z"
                            }},
                            {"catalogEntry": {
                                "version": "1.1.0",
                                "description": "",
                                "published": "1900-01-01T00:00:00+00:00"
                            }}
                        ]
                    },
                    {"@id": "https://feed/reg/example/page2.json"}
                ]
            }"#,
        )
        .unwrap();

        let records = index.into_records();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].origin, RecordOrigin::Metadata);
        assert_eq!(records[0].authors, vec!["Jane", "John"]);
        assert_eq!(records[0].listed, Some(true));
        assert_eq!(
            records[0].published.map(|p| p.to_rfc3339()),
            Some("2024-01-02T03:04:05+00:00".to_string())
        );

        assert_eq!(records[1].description, None);
        assert_eq!(records[1].listed, Some(false));
    }
}
