//! Service index resolution.
//!
//! A feed root advertises its services in a JSON index document listing
//! `{"@type", "@id"}` resources. Resolution fetches that document once and
//! picks the first resource per known service kind.

use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use tokio_util::sync::CancellationToken;

use super::OneOrMany;
use crate::error::{DiscoveryError, FeedError};
use crate::http::HttpClient;

/// Path appended to a feed root that does not already name its index document.
pub const INDEX_PATH: &str = "v3/index.json";

/// Service kinds the client knows how to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Search query service (required).
    Search,
    /// Push and delete.
    Publish,
    /// Per-package metadata documents.
    Registrations,
    /// Flat package content container.
    PackageBase,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::Search,
        ServiceKind::Publish,
        ServiceKind::Registrations,
        ServiceKind::PackageBase,
    ];

    /// Substring looked for in a resource's `@type`.
    pub fn marker(self) -> &'static str {
        match self {
            ServiceKind::Search => "SearchQueryService",
            ServiceKind::Publish => "PackagePublish",
            ServiceKind::Registrations => "RegistrationsBaseUrl",
            ServiceKind::PackageBase => "PackageBaseAddress",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

#[derive(Debug, Deserialize)]
struct ServiceIndex {
    #[serde(default)]
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: OneOrMany,
}

/// Endpoints resolved from one feed root's service index.
///
/// Immutable once built. Use [`FeedEndpoints::is_for`] before reusing a value
/// for a feed root that may have changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    index_url: String,
    search: String,
    services: HashMap<ServiceKind, String>,
}

impl FeedEndpoints {
    /// Endpoints known up front, without fetching an index.
    pub fn new(index_url: impl Into<String>, search: impl Into<String>) -> Self {
        let search = search.into();
        let mut services = HashMap::new();
        services.insert(ServiceKind::Search, search.clone());
        Self {
            index_url: index_url.into(),
            search,
            services,
        }
    }

    pub fn with_service(mut self, kind: ServiceKind, url: impl Into<String>) -> Self {
        let url = url.into();
        if kind == ServiceKind::Search {
            self.search = url.clone();
        }
        self.services.insert(kind, url);
        self
    }

    fn from_index(index_url: String, index: &ServiceIndex) -> Result<Self, DiscoveryError> {
        let mut services = HashMap::new();
        for kind in ServiceKind::ALL {
            let found = index
                .resources
                .iter()
                .find(|r| r.kind.iter().any(|t| t.contains(kind.marker())));
            if let Some(resource) = found {
                debug!("{} -> {}", kind, resource.id);
                services.insert(kind, resource.id.clone());
            }
        }

        let search = services
            .get(&ServiceKind::Search)
            .cloned()
            .ok_or(DiscoveryError::MissingService(ServiceKind::Search))?;

        Ok(Self {
            index_url,
            search,
            services,
        })
    }

    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    /// Search query service URL, exactly as advertised.
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn get(&self, kind: ServiceKind) -> Option<&str> {
        self.services.get(&kind).map(String::as_str)
    }

    /// Looks up a service the caller cannot do without.
    pub fn require(&self, kind: ServiceKind) -> Result<&str, DiscoveryError> {
        self.get(kind).ok_or(DiscoveryError::MissingService(kind))
    }

    /// Whether these endpoints were resolved for `feed_url`.
    pub fn is_for(&self, feed_url: &str) -> bool {
        self.index_url == index_url_for(feed_url)
    }
}

/// Maps a feed root to its service index URL.
pub fn index_url_for(feed_url: &str) -> String {
    let trimmed = feed_url.trim();
    if trimmed.ends_with("/index.json") {
        trimmed.to_string()
    } else {
        format!("{}/{}", trimmed.trim_end_matches('/'), INDEX_PATH)
    }
}

/// Fetches the service index for `feed_url` and resolves its endpoints.
#[tracing::instrument(skip(http, cancel))]
pub async fn resolve(
    http: &HttpClient,
    feed_url: &str,
    cancel: &CancellationToken,
) -> Result<FeedEndpoints, DiscoveryError> {
    let index_url = index_url_for(feed_url);
    info!("Resolving feed services from {}...", index_url);

    let index: ServiceIndex = match http.get_json(&index_url, cancel).await {
        Ok(index) => index,
        Err(FeedError::Cancelled) => return Err(DiscoveryError::Cancelled),
        Err(source) => {
            return Err(DiscoveryError::Unreachable { index_url, source });
        }
    };

    FeedEndpoints::from_index(index_url, &index)
}
