//! `feedman delete`: confirm, then delete versions one by one.

use anyhow::{Context, Result, bail};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use super::config::Config;
use crate::application::{Selection, confirm};
use crate::error::DeleteError;
use crate::feed::{self, ListVersionsOptions};
use crate::model::{FeedVersion, RemovalOutcome};

/// Deletes (unlists) the given versions of one package.
#[tracing::instrument(skip(config, cancel))]
pub async fn delete(
    config: Config,
    package_id: &str,
    versions: &[String],
    yes: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let requested = versions
        .iter()
        .map(|v| FeedVersion::parse(v).with_context(|| format!("Invalid version {:?}", v)))
        .collect::<Result<Vec<_>>>()?;

    let mut session = config.session;
    let options = ListVersionsOptions {
        include_prerelease: true,
        include_unlisted: true,
    };
    let Some(mut package) = session.load_package(package_id, options, cancel).await? else {
        bail!("Package {} was not found on the feed", package_id);
    };

    let missing: Vec<String> = requested
        .iter()
        .filter(|v| package.version(v).is_none())
        .map(|v| v.to_string())
        .collect();
    if !missing.is_empty() {
        bail!("{} has no version(s) {}", package.id, missing.join(", "));
    }

    let mut selection = Selection::new();
    for version in requested {
        selection.select(&package.id, version);
    }
    let targets = selection.versions_of(&package.id);

    if !yes {
        let listed: Vec<String> = targets.iter().map(|v| v.to_string()).collect();
        let prompt = format!("Delete {} {}?", package.id, listed.join(", "));
        if !confirm(&prompt)? {
            println!("Nothing deleted.");
            return Ok(());
        }
    }

    let endpoints = session.endpoints(cancel).await?;
    for version in &targets {
        let result = feed::delete_version(
            session.http(),
            &endpoints,
            &package.id,
            version,
            session.config(),
            cancel,
        )
        .await;

        match result {
            Ok(()) => {
                info!("Deleted {} {}", package.id, version);
                selection.deselect(&package.id, version);
                match package.remove_version(version) {
                    RemovalOutcome::Removed { remaining } => println!(
                        "Deleted {} {} ({} version(s) left)",
                        package.id, version, remaining
                    ),
                    RemovalOutcome::PackageNowEmpty => println!(
                        "Deleted {} {}; the package now has no versions",
                        package.id, version
                    ),
                    RemovalOutcome::NotPresent => println!("Deleted {} {}", package.id, version),
                }
            }
            Err(DeleteError::Cancelled) => bail!("Delete cancelled"),
            Err(e) => {
                warn!("Failed to delete {} {}: {}", package.id, version, e);
                eprintln!("Failed {} {}: {}", package.id, version, e);
            }
        }
    }

    if !selection.is_empty() {
        bail!(
            "{} of {} version(s) could not be deleted",
            selection.len(),
            targets.len()
        );
    }
    Ok(())
}
