//! `feedman push`: expand inputs, push, report per file.

use anyhow::{Context, Result, bail};
use log::debug;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use super::config::Config;
use crate::archive::is_package_file;
use crate::feed;

#[tracing::instrument(skip(config, cancel))]
pub async fn push(config: Config, inputs: &[String], cancel: &CancellationToken) -> Result<()> {
    let paths = expand_inputs(inputs)?;
    let mut session = config.session;
    let endpoints = session.endpoints(cancel).await?;

    let report =
        feed::push_packages(session.http(), &endpoints, &paths, session.config(), cancel).await?;

    for outcome in &report.outcomes {
        let label = match &outcome.identity {
            Some(identity) => format!("{} ({})", identity, outcome.path.display()),
            None => outcome.path.display().to_string(),
        };
        match &outcome.result {
            Ok(()) => println!("Pushed {}", label),
            Err(e) => eprintln!("Failed {}: {}", label, e),
        }
    }

    if report.was_cancelled() {
        bail!("Push cancelled");
    }
    let failed = report.failed().count();
    if failed > 0 {
        bail!("{} of {} package(s) failed to push", failed, report.outcomes.len());
    }
    Ok(())
}

/// Turns command-line inputs into package files: files are taken as given,
/// directories contribute every package file directly inside them, and
/// anything else is tried as a glob pattern.
pub(crate) fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for input in inputs {
        let path = Path::new(input);
        let found = if path.is_dir() {
            packages_in(path)?
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else if is_pattern(input) {
            let mut matched: Vec<PathBuf> = glob::glob(input)
                .with_context(|| format!("Invalid pattern {:?}", input))?
                .filter_map(|entry| entry.ok())
                .filter(|p| p.is_file())
                .collect();
            matched.sort();
            matched
        } else {
            bail!("No such file or directory: {}", input);
        };

        debug!("{} -> {} file(s)", input, found.len());
        for path in found {
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }

    if paths.is_empty() {
        bail!("No package files found in {}", inputs.join(", "));
    }
    Ok(paths)
}

fn packages_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_package_file(p))
        .collect();
    found.sort();
    Ok(found)
}

fn is_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}
