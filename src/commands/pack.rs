//! `feedman pack`.

use anyhow::{Result, bail};
use log::debug;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::toolchain::{CommandRunner, PackRequest, ProcessRunner, run_pack, scan_solution};

/// Packs a project, or every project of a solution.
#[tracing::instrument(skip(cancel))]
pub async fn pack(
    target: &Path,
    output_dir: Option<PathBuf>,
    version: Option<String>,
    cancel: &CancellationToken,
) -> Result<()> {
    let projects = projects_for(target)?;
    run_all(&ProcessRunner, &projects, output_dir, version, cancel).await
}

fn projects_for(target: &Path) -> Result<Vec<PathBuf>> {
    let is_solution = target
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sln"));
    if !is_solution {
        return Ok(vec![target.to_path_buf()]);
    }

    let projects = scan_solution(target)?;
    if projects.is_empty() {
        bail!("{:?} contains no C# projects", target);
    }
    debug!("{:?} lists {} project(s)", target, projects.len());
    Ok(projects.into_iter().map(|p| p.path).collect())
}

async fn run_all(
    runner: &dyn CommandRunner,
    projects: &[PathBuf],
    output_dir: Option<PathBuf>,
    version: Option<String>,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut failed = 0;
    for project in projects {
        if cancel.is_cancelled() {
            bail!("Packing cancelled");
        }
        let request = PackRequest {
            project: project.clone(),
            output_dir: output_dir.clone(),
            version: version.clone(),
        };
        match run_pack(runner, &request, cancel).await {
            Ok(dir) => println!("Packed {} into {}", project.display(), dir.display()),
            Err(e) => {
                eprintln!("Failed to pack {}: {:#}", project.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} project(s) failed to pack", failed, projects.len());
    }
    Ok(())
}
