//! External build tooling.
//!
//! Packing is delegated to the `dotnet` CLI. Process spawning sits behind
//! [`CommandRunner`] so the packing logic can be exercised without it.

mod pack;
mod solution;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

pub use pack::{PackRequest, default_output_dir, pack_arguments, run_pack};
pub use solution::{SolutionProject, parse_solution, scan_solution};

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` to completion, capturing its output line by line.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<CommandOutput>;
}

/// Spawns real processes with `tokio::process`.
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<CommandOutput> {
        debug!("Running {} {:?}...", program, args);
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}. Is it installed and on PATH?", program))?;

        let stdout = child.stdout.take().context("stdout was not captured")?;
        let stderr = child.stderr.take().context("stderr was not captured")?;
        let stdout_task = tokio::spawn(collect_lines(stdout, program.to_string(), false));
        let stderr_task = tokio::spawn(collect_lines(stderr, program.to_string(), true));

        let status = tokio::select! {
            biased;
            // Returning drops `child`, which kills it.
            _ = cancel.cancelled() => bail!("{} was cancelled", program),
            status = child.wait() => status.with_context(|| format!("Failed to wait for {}", program))?,
        };

        Ok(CommandOutput {
            code: status.code(),
            stdout: stdout_task.await.unwrap_or_default(),
            stderr: stderr_task.await.unwrap_or_default(),
        })
    }
}

async fn collect_lines<R>(reader: R, program: String, is_stderr: bool) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut collected = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        if is_stderr {
            warn!("[{}] {}", program, line);
        } else {
            info!("[{}] {}", program, line);
        }
        collected.push(line);
    }
    collected
}
