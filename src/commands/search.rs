//! `feedman search`.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use super::config::Config;
use crate::feed::{self, SearchOptions};
use crate::model::Package;

#[tracing::instrument(skip(config, options, cancel))]
pub async fn search(
    config: Config,
    query: &str,
    take: usize,
    options: &SearchOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut session = config.session;
    let endpoints = session.endpoints(cancel).await?;

    match feed::search_packages(session.http(), &endpoints, query, take, options, cancel).await {
        Ok(packages) => {
            print_packages(&packages);
            Ok(())
        }
        Err(failure) => {
            print_packages(&failure.partial);
            let collected = failure.partial.len();
            Err(failure.error)
                .with_context(|| format!("Search stopped after {} package(s)", collected))
        }
    }
}

fn print_packages(packages: &[Package]) {
    if packages.is_empty() {
        println!("No packages found.");
        return;
    }
    for package in packages {
        println!("{}", package_line(package));
        if let Some(description) = package.description.as_deref() {
            let description = description.trim();
            if !description.is_empty() {
                println!("    {}", first_line(description));
            }
        }
        if package.versions().len() > 1 {
            let versions: Vec<String> = package
                .versions()
                .iter()
                .map(|v| v.version.to_string())
                .collect();
            println!("    versions: {}", versions.join(", "));
        }
    }
}

fn package_line(package: &Package) -> String {
    let mut line = package.id.clone();
    if let Some(latest) = package.latest() {
        line.push(' ');
        line.push_str(latest.version.as_str());
    }
    if let Some(downloads) = package.total_downloads {
        line.push_str(&format!("  ({} downloads)", downloads));
    }
    line
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeedVersion, PackageVersion};

    #[test]
    fn test_package_line() {
        let mut package = Package::new("Example.Package").with_versions(vec![
            PackageVersion::new(FeedVersion::parse("1.0.0").unwrap()),
            PackageVersion::new(FeedVersion::parse("2.0.0").unwrap()),
        ]);
        package.total_downloads = Some(42);

        assert_eq!(package_line(&package), "Example.Package 2.0.0  (42 downloads)");
        assert_eq!(package_line(&Package::new("Bare")), "Bare");
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("one\ntwo"), "one");
        assert_eq!(first_line("single"), "single");
    }
}
