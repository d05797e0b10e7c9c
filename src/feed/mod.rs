//! Feed interaction core.
//!
//! Everything here is stateless between calls: endpoints and configuration
//! come in as values, results go out as new [`crate::model`] values, and the
//! caller decides what to keep.

mod discovery;
mod lifecycle;
mod records;
mod search;
mod versions;

use serde::Deserialize;
use std::fmt;

pub use discovery::{FeedEndpoints, INDEX_PATH, ServiceKind, index_url_for, resolve};
pub use lifecycle::{API_KEY_HEADER, PushOutcome, PushReport, delete_version, push_packages};
pub use search::{
    FixedDelay, MAX_PAGE_SIZE, OrderBy, Pacing, SearchOptions, VersionExpansion, search_packages,
    search_packages_paced,
};
pub use versions::{ListVersionsOptions, list_versions, load_package};

#[cfg(test)]
pub(crate) use search::MockPacing;

/// Where a feed lives and how to authenticate against it.
#[derive(Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub feed_url: String,
    pub api_key: Option<String>,
}

impl FeedConfig {
    pub fn new(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// The API key, treating an empty string as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

impl fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedConfig")
            .field("feed_url", &self.feed_url)
            .field("api_key", &self.api_key().map(|_| "********"))
            .finish()
    }
}

/// JSON fields that feeds emit either as a single string or as an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub(crate) fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            OneOrMany::One(item) => std::slice::from_ref(item),
            OneOrMany::Many(items) => items,
        };
        items.iter().map(String::as_str)
    }

    /// Flattens to a list, splitting comma-separated single values
    /// ("Jane, John") the way feeds often report authors.
    pub(crate) fn into_list(self) -> Vec<String> {
        match self {
            OneOrMany::One(item) => item
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            OneOrMany::Many(items) => items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}
