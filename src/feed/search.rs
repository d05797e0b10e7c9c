//! Paged package search.

use async_trait::async_trait;
use log::{debug, info};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::FeedEndpoints;
use super::records::{SearchHit, SearchResponse, merge_records};
use crate::error::{FeedError, SearchFailure};
use crate::http::HttpClient;
use crate::model::Package;

/// Largest page the search service accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_PACING: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    /// Package id, case-insensitive.
    Id,
    /// Whatever order the feed returned.
    #[default]
    Relevance,
}

/// Whether search hits carry their own version lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionExpansion {
    /// Packages come back with no versions attached.
    #[default]
    None,
    /// Each hit's `versions` array is normalized onto its package.
    Inline,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub include_prerelease: bool,
    pub include_delisted: bool,
    pub order_by: OrderBy,
    /// Items requested per page; clamped to `1..=MAX_PAGE_SIZE`.
    pub page_size: u32,
    /// Delay inserted between consecutive page requests.
    pub pacing: Duration,
    pub expand: VersionExpansion,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            include_prerelease: true,
            include_delisted: false,
            order_by: OrderBy::default(),
            page_size: MAX_PAGE_SIZE,
            pacing: DEFAULT_PACING,
            expand: VersionExpansion::default(),
        }
    }
}

impl SearchOptions {
    fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE) as usize
    }
}

/// Wait inserted between page requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Pacing: Send + Sync {
    async fn wait(&self, cancel: &CancellationToken) -> Result<(), FeedError>;
}

/// Sleeps for a fixed duration, waking early with `Cancelled`.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Default for FixedDelay {
    fn default() -> Self {
        Self(DEFAULT_PACING)
    }
}

#[async_trait]
impl Pacing for FixedDelay {
    async fn wait(&self, cancel: &CancellationToken) -> Result<(), FeedError> {
        if self.0.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FeedError::Cancelled),
            _ = tokio::time::sleep(self.0) => Ok(()),
        }
    }
}

/// Searches the feed for up to `desired_count` packages.
///
/// Uses a [`FixedDelay`] of `options.pacing` between pages. See
/// [`search_packages_paced`] for the paging rules.
pub async fn search_packages(
    http: &HttpClient,
    endpoints: &FeedEndpoints,
    query: &str,
    desired_count: usize,
    options: &SearchOptions,
    cancel: &CancellationToken,
) -> Result<Vec<Package>, SearchFailure<Package>> {
    let pacing = FixedDelay(options.pacing);
    search_packages_paced(http, endpoints, query, desired_count, options, &pacing, cancel).await
}

/// Searches the feed page by page with an explicit pacing strategy.
///
/// Pages are fetched strictly in order, each asking for
/// `min(page_size, desired_count - collected)` items at offset
/// `page * page_size`. Paging stops once enough packages are collected, when
/// a page comes back short, or when it comes back empty. A failure on any page
/// (including cancellation) returns what was collected so far inside the
/// [`SearchFailure`].
#[tracing::instrument(skip(http, endpoints, options, pacing, cancel))]
pub async fn search_packages_paced(
    http: &HttpClient,
    endpoints: &FeedEndpoints,
    query: &str,
    desired_count: usize,
    options: &SearchOptions,
    pacing: &dyn Pacing,
    cancel: &CancellationToken,
) -> Result<Vec<Package>, SearchFailure<Package>> {
    let page_size = options.effective_page_size();
    let mut packages: Vec<Package> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut page = 0usize;

    while packages.len() < desired_count {
        let take = page_size.min(desired_count - packages.len());
        let skip = page * page_size;

        if page > 0 {
            if let Err(error) = pacing.wait(cancel).await {
                return Err(partial_failure(packages, options, error));
            }
        }

        debug!("Fetching search page {} (skip={}, take={})...", page, skip, take);
        let response = match fetch_page(http, endpoints.search(), query, skip, take, options, cancel).await {
            Ok(response) => response,
            Err(error) => return Err(partial_failure(packages, options, error)),
        };

        if page == 0 {
            if let Some(total) = response.total_hits {
                debug!("Feed reports {} total hit(s) for {:?}", total, query);
            }
        }

        let returned = response.data.len();
        for hit in response.data {
            if !options.include_delisted && hit.listed == Some(false) {
                debug!("Skipping delisted package {}", hit.id);
                continue;
            }
            if !seen.insert(hit.id.to_lowercase()) {
                continue;
            }
            packages.push(hit_to_package(hit, options));
        }

        if returned == 0 || returned < take {
            break;
        }
        page += 1;
    }

    let packages = finish(packages, desired_count, options);
    info!("Search for {:?} collected {} package(s)", query, packages.len());
    Ok(packages)
}

async fn fetch_page(
    http: &HttpClient,
    search_url: &str,
    query: &str,
    skip: usize,
    take: usize,
    options: &SearchOptions,
    cancel: &CancellationToken,
) -> Result<SearchResponse, FeedError> {
    let params = [
        ("q", query.to_string()),
        ("skip", skip.to_string()),
        ("take", take.to_string()),
        ("prerelease", options.include_prerelease.to_string()),
        ("semVerLevel", "2.0.0".to_string()),
    ];
    http.get_json_with_query(search_url, &params, cancel).await
}

fn hit_to_package(hit: SearchHit, options: &SearchOptions) -> Package {
    let package = hit.to_package();
    match options.expand {
        VersionExpansion::None => package,
        VersionExpansion::Inline => {
            let mut versions = merge_records(hit.version_records());
            if !options.include_prerelease {
                versions.retain(|v| !v.is_prerelease());
            }
            package.with_versions(versions)
        }
    }
}

fn finish(mut packages: Vec<Package>, desired_count: usize, options: &SearchOptions) -> Vec<Package> {
    packages.truncate(desired_count);
    if options.order_by == OrderBy::Id {
        packages.sort_by_key(|p| p.id.to_lowercase());
    }
    packages
}

fn partial_failure(
    packages: Vec<Package>,
    options: &SearchOptions,
    error: FeedError,
) -> SearchFailure<Package> {
    let desired = packages.len();
    SearchFailure {
        partial: finish(packages, desired, options),
        error,
    }
}
