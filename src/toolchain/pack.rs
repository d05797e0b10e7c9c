use anyhow::{Context, Result, bail};
use log::info;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use super::CommandRunner;
use crate::model::FeedVersion;

const DOTNET: &str = "dotnet";

/// One project to pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRequest {
    pub project: PathBuf,
    /// Defaults to [`default_output_dir`].
    pub output_dir: Option<PathBuf>,
    /// Overrides the project's package version.
    pub version: Option<String>,
}

impl PackRequest {
    pub fn new(project: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            output_dir: None,
            version: None,
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| default_output_dir(&self.project))
    }
}

/// `<project dir>/../nupkgs`.
pub fn default_output_dir(project: &Path) -> PathBuf {
    let dir = match project.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    dir.join("..").join("nupkgs")
}

pub fn pack_arguments(project: &Path, output_dir: &Path, version: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "pack".to_string(),
        project.display().to_string(),
        "-c".to_string(),
        "Release".to_string(),
        "-o".to_string(),
        output_dir.display().to_string(),
    ];
    if let Some(version) = version {
        args.push(format!("/p:PackageVersion={}", version));
    }
    args
}

/// Packs one project, returning the directory the packages were written to.
#[tracing::instrument(skip(runner, cancel))]
pub async fn run_pack(
    runner: &dyn CommandRunner,
    request: &PackRequest,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    if !request.project.is_file() {
        bail!("Project file not found: {:?}", request.project);
    }
    let version = request
        .version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(version) = version {
        FeedVersion::parse(version)
            .with_context(|| format!("Invalid package version {:?}", version))?;
    }

    let output_dir = request.output_dir();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    info!("Packing {:?} into {:?}...", request.project, output_dir);
    let args = pack_arguments(&request.project, &output_dir, version);
    let output = runner.run(DOTNET, &args, cancel).await?;

    if !output.success() {
        let code = output
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        bail!(
            "Packing {:?} failed (exit {}):\n{}",
            request.project,
            code,
            output.stderr.join("\n")
        );
    }

    info!("Packed {:?}", request.project);
    Ok(output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::{CommandOutput, MockCommandRunner};
    use mockall::predicate::eq;
    use tempfile::tempdir;

    #[test]
    fn test_default_output_dir() {
        assert_eq!(
            default_output_dir(Path::new("/src/App/App.csproj")),
            PathBuf::from("/src/App/../nupkgs")
        );
        assert_eq!(
            default_output_dir(Path::new("App.csproj")),
            PathBuf::from("./../nupkgs")
        );
    }

    #[test]
    fn test_pack_arguments() {
        let args = pack_arguments(Path::new("a/App.csproj"), Path::new("out"), Some("1.2.3"));
        assert_eq!(
            args,
            vec![
                "pack",
                "a/App.csproj",
                "-c",
                "Release",
                "-o",
                "out",
                "/p:PackageVersion=1.2.3"
            ]
        );
        assert_eq!(pack_arguments(Path::new("App.csproj"), Path::new("out"), None).len(), 6);
    }

    #[tokio::test]
    async fn test_run_pack_success_creates_output_dir() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("App").join("App.csproj");
        std::fs::create_dir_all(project.parent().unwrap()).unwrap();
        std::fs::write(&project, "<Project/>").unwrap();
        let out = dir.path().join("packages");

        let expected = pack_arguments(&project, &out, Some("2.0.0-rc.1"));
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .with(eq("dotnet"), eq(expected), mockall::predicate::always())
            .times(1)
            .returning(|_, _, _| {
                Ok(CommandOutput {
                    code: Some(0),
                    stdout: vec!["Successfully created package".into()],
                    stderr: vec![],
                })
            });

        let request = PackRequest {
            project: project.clone(),
            output_dir: Some(out.clone()),
            version: Some("2.0.0-rc.1".into()),
        };
        let written = run_pack(&runner, &request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(written, out);
        assert!(out.is_dir());
    }

    #[tokio::test]
    async fn test_run_pack_failure_carries_stderr() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("App.csproj");
        std::fs::write(&project, "<Project/>").unwrap();

        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|_, _, _| {
            Ok(CommandOutput {
                code: Some(1),
                stdout: vec![],
                stderr: vec!["error NU5026: missing file".into()],
            })
        });

        let request = PackRequest {
            output_dir: Some(dir.path().join("out")),
            ..PackRequest::new(&project)
        };
        let err = run_pack(&runner, &request, &CancellationToken::new())
            .await
            .unwrap_err();

        let text = err.to_string();
        assert!(text.contains("exit 1"));
        assert!(text.contains("NU5026"));
    }

    #[tokio::test]
    async fn test_run_pack_rejects_missing_project_and_bad_version() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(0);

        let err = run_pack(
            &runner,
            &PackRequest::new("/nonexistent/App.csproj"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("not found"));

        let dir = tempdir().unwrap();
        let project = dir.path().join("App.csproj");
        std::fs::write(&project, "<Project/>").unwrap();
        let request = PackRequest {
            version: Some("1.x".into()),
            ..PackRequest::new(&project)
        };
        let err = run_pack(&runner, &request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid package version"));
    }
}
