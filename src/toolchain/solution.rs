//! Best-effort project listing from a `.sln` file.

use anyhow::{Context, Result};
use log::debug;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionProject {
    /// Project file stem, suffixed with ` (2)`, ` (3)`... when names clash.
    pub name: String,
    pub path: PathBuf,
}

/// Reads a solution file and lists its C# projects.
pub fn scan_solution(path: &Path) -> Result<Vec<SolutionProject>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read solution {:?}", path))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let projects = parse_solution(&text, dir);
    debug!("Found {} project(s) in {:?}", projects.len(), path);
    Ok(projects)
}

/// Picks `Project(...) = "Name", "path.csproj", "{GUID}"` lines out of a
/// solution. Solution folders and non-C# projects are skipped; relative paths
/// are resolved against `solution_dir`.
pub fn parse_solution(text: &str, solution_dir: &Path) -> Vec<SolutionProject> {
    let mut names = HashSet::new();
    let mut projects = Vec::new();

    for line in text.lines() {
        let line = line.trim_start();
        if !line.starts_with("Project(") || !line.contains(", \"") {
            continue;
        }
        let Some((_, right)) = line.split_once('=') else {
            continue;
        };
        let Some(raw_path) = right.split(',').nth(1) else {
            continue;
        };

        let relative = raw_path.trim().trim_matches('"').replace('\\', "/");
        if !relative.to_ascii_lowercase().ends_with(".csproj") {
            continue;
        }

        let relative = PathBuf::from(relative);
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut name = stem.clone();
        let mut suffix = 1;
        while names.contains(&name) {
            suffix += 1;
            name = format!("{} ({})", stem, suffix);
        }
        names.insert(name.clone());

        let path = if relative.is_absolute() {
            relative
        } else {
            solution_dir.join(relative)
        };
        projects.push(SolutionProject { name, path });
    }

    projects
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SOLUTION: &str = r#"
Microsoft Visual Studio Solution File, Format Version 12.00
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "Core", "src\Core\Core.csproj", "{11111111-1111-1111-1111-111111111111}"
EndProject
Project("{2150E333-8FDC-42A3-9474-1A3956D46DE8}") = "Solution Items", "Solution Items", "{22222222-2222-2222-2222-222222222222}"
EndProject
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "Core.Legacy", "legacy\Core.CSPROJ", "{33333333-3333-3333-3333-333333333333}"
EndProject
Project("{F2A71F9B-5D33-465A-A702-920D77279786}") = "Tool", "tools\Tool.fsproj", "{44444444-4444-4444-4444-444444444444}"
EndProject
Global
EndGlobal
"#;

    #[test]
    fn test_parse_solution() {
        let projects = parse_solution(SOLUTION, Path::new("/work"));

        assert_eq!(
            projects,
            vec![
                SolutionProject {
                    name: "Core".into(),
                    path: PathBuf::from("/work/src/Core/Core.csproj"),
                },
                SolutionProject {
                    name: "Core (2)".into(),
                    path: PathBuf::from("/work/legacy/Core.CSPROJ"),
                },
            ]
        );
    }

    #[test]
    fn test_parse_solution_ignores_noise() {
        assert!(parse_solution("", Path::new(".")).is_empty());
        assert!(parse_solution("Project(broken line", Path::new(".")).is_empty());
    }

    #[test]
    fn test_scan_solution_resolves_against_solution_dir() -> Result<()> {
        let dir = tempdir()?;
        let sln = dir.path().join("App.sln");
        std::fs::write(&sln, SOLUTION)?;

        let projects = scan_solution(&sln)?;
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].path, dir.path().join("src/Core/Core.csproj"));
        Ok(())
    }

    #[test]
    fn test_scan_solution_missing_file() {
        let err = scan_solution(Path::new("/nonexistent/App.sln")).unwrap_err();
        assert!(err.to_string().contains("Failed to read solution"));
    }
}
