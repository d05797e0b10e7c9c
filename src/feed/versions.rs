//! Version aggregation for a single package.

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use super::records::{RawVersionRecord, RegistrationIndex, SearchHit, SearchResponse, merge_records};
use super::{FeedEndpoints, ServiceKind};
use crate::error::FeedError;
use crate::http::HttpClient;
use crate::model::{Package, PackageVersion};

/// How many hits to scan when looking a package up by id.
const LOOKUP_TAKE: u32 = 20;

/// Which versions [`list_versions`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListVersionsOptions {
    pub include_prerelease: bool,
    /// "Unlisted" and "delisted" are the same flag here; its exact meaning is
    /// up to the feed implementation.
    pub include_unlisted: bool,
}

impl Default for ListVersionsOptions {
    fn default() -> Self {
        Self {
            include_prerelease: true,
            include_unlisted: false,
        }
    }
}

/// Lists every version the feed reports for `package_id`, newest first.
///
/// Registration metadata is read when the feed advertises it, and the search
/// service contributes its own version list; both go through one merge. An
/// unknown package yields an empty list.
#[tracing::instrument(skip(http, endpoints, cancel))]
pub async fn list_versions(
    http: &HttpClient,
    endpoints: &FeedEndpoints,
    package_id: &str,
    options: ListVersionsOptions,
    cancel: &CancellationToken,
) -> Result<Vec<PackageVersion>, FeedError> {
    let (_, records) = collect_records(http, endpoints, package_id, cancel).await?;
    Ok(apply_options(merge_records(records), options))
}

/// Loads one package with its package-level fields and filtered versions.
///
/// Returns `None` when the feed knows nothing about `package_id`.
#[tracing::instrument(skip(http, endpoints, cancel))]
pub async fn load_package(
    http: &HttpClient,
    endpoints: &FeedEndpoints,
    package_id: &str,
    options: ListVersionsOptions,
    cancel: &CancellationToken,
) -> Result<Option<Package>, FeedError> {
    let (hit, records) = collect_records(http, endpoints, package_id, cancel).await?;
    if hit.is_none() && records.is_empty() {
        return Ok(None);
    }

    let versions = apply_options(merge_records(records), options);
    let package = match hit {
        Some(hit) => hit.to_package(),
        None => Package::new(package_id),
    };
    Ok(Some(package.with_versions(versions)))
}

async fn collect_records(
    http: &HttpClient,
    endpoints: &FeedEndpoints,
    package_id: &str,
    cancel: &CancellationToken,
) -> Result<(Option<SearchHit>, Vec<RawVersionRecord>), FeedError> {
    let package_id = package_id.trim();
    if package_id.is_empty() {
        return Ok((None, Vec::new()));
    }

    let mut records = Vec::new();

    if let Some(base) = endpoints.get(ServiceKind::Registrations) {
        let url = registration_url(base, package_id);
        match http.get_json_optional::<RegistrationIndex>(&url, cancel).await? {
            Some(index) => records.extend(index.into_records()),
            None => debug!("No registration metadata for {}", package_id),
        }
    }

    let hit = find_search_hit(http, endpoints.search(), package_id, cancel).await?;
    if let Some(hit) = &hit {
        records.extend(hit.version_records());
    }

    info!("Collected {} version record(s) for {}", records.len(), package_id);
    Ok((hit, records))
}

async fn find_search_hit(
    http: &HttpClient,
    search_url: &str,
    package_id: &str,
    cancel: &CancellationToken,
) -> Result<Option<SearchHit>, FeedError> {
    let query = [
        ("q", format!("packageid:{}", package_id)),
        ("skip", "0".to_string()),
        ("take", LOOKUP_TAKE.to_string()),
        ("prerelease", "true".to_string()),
        ("semVerLevel", "2.0.0".to_string()),
    ];
    let response: SearchResponse = http.get_json_with_query(search_url, &query, cancel).await?;
    Ok(response
        .data
        .into_iter()
        .find(|hit| hit.id.eq_ignore_ascii_case(package_id)))
}

fn registration_url(base: &str, package_id: &str) -> String {
    format!(
        "{}/{}/index.json",
        base.trim_end_matches('/'),
        package_id.to_lowercase()
    )
}

fn apply_options(
    mut versions: Vec<PackageVersion>,
    options: ListVersionsOptions,
) -> Vec<PackageVersion> {
    versions.retain(|v| {
        (options.include_prerelease || !v.is_prerelease())
            && (options.include_unlisted || v.listed)
    });
    versions
}
