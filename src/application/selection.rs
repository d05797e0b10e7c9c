//! The user's version picks, tracked outside the model.

use std::collections::{BTreeSet, HashMap};

use crate::model::FeedVersion;

/// Versions the user has picked, kept beside the model rather than in it.
///
/// Keyed by lowercase package id, so `Foo` and `foo` share one entry.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: HashMap<String, BTreeSet<FeedVersion>>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(package_id: &str) -> String {
        package_id.to_lowercase()
    }

    /// Returns `false` if the version was already selected.
    pub fn select(&mut self, package_id: &str, version: FeedVersion) -> bool {
        self.selected
            .entry(Self::key(package_id))
            .or_default()
            .insert(version)
    }

    /// Returns `false` if the version was not selected.
    pub fn deselect(&mut self, package_id: &str, version: &FeedVersion) -> bool {
        let key = Self::key(package_id);
        let Some(versions) = self.selected.get_mut(&key) else {
            return false;
        };
        let removed = versions.remove(version);
        if versions.is_empty() {
            self.selected.remove(&key);
        }
        removed
    }

    /// Selected versions of one package, newest first.
    pub fn versions_of(&self, package_id: &str) -> Vec<FeedVersion> {
        self.selected
            .get(&Self::key(package_id))
            .map(|versions| versions.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.selected.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> FeedVersion {
        FeedVersion::parse(text).unwrap()
    }

    #[test]
    fn test_select_is_case_insensitive_on_id() {
        let mut selection = Selection::new();
        assert!(selection.select("Example.Package", v("1.0.0")));
        assert!(!selection.select("example.package", v("1.0")));

        assert_eq!(selection.versions_of("EXAMPLE.PACKAGE"), vec![v("1.0.0")]);
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_versions_of_newest_first() {
        let mut selection = Selection::new();
        for text in ["1.0.0", "2.0.0-beta", "2.0.0", "1.1.0"] {
            selection.select("A", v(text));
        }

        let versions: Vec<String> = selection
            .versions_of("a")
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(versions, vec!["2.0.0", "2.0.0-beta", "1.1.0", "1.0.0"]);
    }

    #[test]
    fn test_deselect() {
        let mut selection = Selection::new();
        selection.select("A", v("1.0.0"));
        selection.select("B", v("1.0.0"));

        assert!(selection.deselect("a", &v("1.0")));
        assert!(!selection.deselect("A", &v("1.0.0")));
        assert_eq!(selection.len(), 1);

        assert!(selection.deselect("B", &v("1.0.0")));
        assert!(selection.is_empty());
        assert!(selection.versions_of("A").is_empty());
    }
}
