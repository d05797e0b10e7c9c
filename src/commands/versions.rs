//! `feedman versions`.

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use super::config::Config;
use crate::feed::ListVersionsOptions;
use crate::model::PackageVersion;

#[tracing::instrument(skip(config, cancel))]
pub async fn versions(
    config: Config,
    package_id: &str,
    options: ListVersionsOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut session = config.session;
    let Some(package) = session.load_package(package_id, options, cancel).await? else {
        println!("Package {} was not found on the feed.", package_id);
        return Ok(());
    };

    println!("{}", package.id);
    if package.is_empty() {
        println!("  (no versions match)");
    }
    for version in package.versions() {
        println!("  {}", version_line(version));
    }
    Ok(())
}

fn version_line(version: &PackageVersion) -> String {
    let mut line = format!("{:<24}", version.version.as_str());
    if let Some(published) = version.published {
        line.push_str(&format!(" {}", published.format("%Y-%m-%d")));
    }
    if let Some(downloads) = version.download_count {
        line.push_str(&format!(" {:>10} downloads", downloads));
    }
    if !version.listed {
        line.push_str(" [unlisted]");
    }
    line.trim_end().to_string()
}
