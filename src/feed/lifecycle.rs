//! Push and delete against the feed's publish service.
//!
//! Neither operation touches caller-held model state. A successful delete is
//! applied by the caller through `Package::remove_version`.

use anyhow::Context;
use log::{info, warn};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use super::{FeedConfig, FeedEndpoints, ServiceKind};
use crate::archive::{self, PackageIdentity};
use crate::error::{DeleteError, FeedError, PushError};
use crate::http::{HttpClient, describe_status, response_text};
use crate::model::FeedVersion;

/// Header carrying the feed API key.
pub const API_KEY_HEADER: &str = "X-NuGet-ApiKey";

/// Result of pushing one file.
#[derive(Debug)]
pub struct PushOutcome {
    pub path: PathBuf,
    /// Read from the package manifest; `None` when the file is not a valid package.
    pub identity: Option<PackageIdentity>,
    pub result: Result<(), PushError>,
}

impl PushOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-file outcomes of a push batch, in input order.
#[derive(Debug, Default)]
pub struct PushReport {
    pub outcomes: Vec<PushOutcome>,
}

impl PushReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &PushOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &PushOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn is_complete_success(&self) -> bool {
        self.outcomes.iter().all(PushOutcome::is_success)
    }

    pub fn was_cancelled(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o.result, Err(PushError::Cancelled)))
    }
}

/// Pushes each file to the feed, one at a time, reporting per file.
///
/// A failing file does not stop the batch. Cancellation does: the in-flight
/// file is reported as `Cancelled` and later files are not attempted. The
/// only batch-level error is a feed without a publish service.
#[tracing::instrument(skip(http, endpoints, config, cancel))]
pub async fn push_packages(
    http: &HttpClient,
    endpoints: &FeedEndpoints,
    paths: &[PathBuf],
    config: &FeedConfig,
    cancel: &CancellationToken,
) -> Result<PushReport, PushError> {
    let publish_url = endpoints.require(ServiceKind::Publish)?;
    let mut report = PushReport::default();

    for path in paths {
        if cancel.is_cancelled() {
            report.outcomes.push(PushOutcome {
                path: path.clone(),
                identity: None,
                result: Err(PushError::Cancelled),
            });
            break;
        }

        let (identity, bytes) = match load_package_file(path).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Skipping {:?}: {:#}", path, e);
                report.outcomes.push(PushOutcome {
                    path: path.clone(),
                    identity: None,
                    result: Err(PushError::PerFileFailure {
                        path: path.clone(),
                        reason: format!("{:#}", e),
                    }),
                });
                continue;
            }
        };

        info!("Pushing {} from {:?}...", identity, path);
        let result = push_one(http, publish_url, path, bytes, config, cancel).await;
        match &result {
            Ok(()) => info!("Pushed {}", identity),
            Err(e) => warn!("Failed to push {}: {}", identity, e),
        }

        let cancelled = matches!(result, Err(PushError::Cancelled));
        report.outcomes.push(PushOutcome {
            path: path.clone(),
            identity: Some(identity),
            result,
        });
        if cancelled {
            break;
        }
    }

    Ok(report)
}

/// Reads a package file once, returning its identity and its bytes for upload.
async fn load_package_file(path: &Path) -> anyhow::Result<(PackageIdentity, Vec<u8>)> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read package {:?}", path))?;
    let identity = archive::read_identity(&bytes)
        .with_context(|| format!("Invalid package {:?}", path))?;
    Ok((identity, bytes))
}

async fn push_one(
    http: &HttpClient,
    publish_url: &str,
    path: &Path,
    bytes: Vec<u8>,
    config: &FeedConfig,
    cancel: &CancellationToken,
) -> Result<(), PushError> {
    let per_file = |reason: String| PushError::PerFileFailure {
        path: path.to_path_buf(),
        reason,
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "package.nupkg".to_string());
    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("application/octet-stream")
        .map_err(|e| per_file(e.to_string()))?;
    let form = Form::new().part("package", part);

    let mut request = http.inner().put(publish_url).multipart(form);
    if let Some(key) = config.api_key() {
        request = request.header(API_KEY_HEADER, key);
    }

    let response = http.execute(publish_url, request, cancel).await?;
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response_text(response, cancel).await;
    if cancel.is_cancelled() {
        return Err(PushError::Cancelled);
    }
    let message = describe_status(status, &body);

    if is_auth_failure(status) {
        return Err(PushError::Unauthorized {
            status: status.as_u16(),
            message: auth_message(config, message),
        });
    }
    if status.is_client_error() {
        return Err(per_file(message));
    }
    Err(PushError::Transport(FeedError::Transport {
        url: publish_url.to_string(),
        status: Some(status.as_u16()),
        message,
    }))
}

/// Deletes (or unlists, depending on the feed) one package version.
///
/// Confirmation is the caller's job; this performs the request immediately.
#[tracing::instrument(skip(http, endpoints, config, cancel))]
pub async fn delete_version(
    http: &HttpClient,
    endpoints: &FeedEndpoints,
    package_id: &str,
    version: &FeedVersion,
    config: &FeedConfig,
    cancel: &CancellationToken,
) -> Result<(), DeleteError> {
    let publish_url = endpoints.require(ServiceKind::Publish)?;
    let url = format!(
        "{}/{}/{}",
        publish_url.trim_end_matches('/'),
        package_id,
        version.normalized()
    );

    let mut request = http.inner().delete(&url);
    if let Some(key) = config.api_key() {
        request = request.header(API_KEY_HEADER, key);
    }

    info!("Deleting {} {}...", package_id, version);
    let response = http.execute(&url, request, cancel).await?;
    let status = response.status();
    if status.is_success() {
        info!("Deleted {} {}", package_id, version);
        return Ok(());
    }

    let body = response_text(response, cancel).await;
    if cancel.is_cancelled() {
        return Err(DeleteError::Cancelled);
    }
    let message = describe_status(status, &body);

    if status == StatusCode::NOT_FOUND {
        return Err(DeleteError::NotFound {
            package_id: package_id.to_string(),
            version: version.to_string(),
        });
    }
    if is_auth_failure(status) {
        return Err(DeleteError::Unauthorized {
            status: status.as_u16(),
            message: auth_message(config, message),
        });
    }
    Err(DeleteError::Transport(FeedError::Transport {
        url,
        status: Some(status.as_u16()),
        message,
    }))
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

fn auth_message(config: &FeedConfig, message: String) -> String {
    if config.api_key().is_none() {
        format!("{} (no API key configured)", message)
    } else {
        message
    }
}
