// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External command execution with timeouts.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::adapter::AdapterError;

/// Captured output of a finished command.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Fail with [`AdapterError::NonZeroExit`] unless the command exited 0.
    pub fn ensure_success(self, tool: &str) -> Result<Self, AdapterError> {
        if self.success() {
            Ok(self)
        } else {
            Err(AdapterError::NonZeroExit {
                tool: tool.to_owned(),
                code: self.exit_code,
                stderr: self.stderr.trim().to_owned(),
            })
        }
    }
}

/// Run `program args...` and collect its output.
///
/// The child is killed if `timeout` elapses first.
pub async fn run(program: &str, args: &[&str], timeout: Duration) -> Result<ExecOutput, AdapterError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| AdapterError::Spawn { tool: program.to_owned(), message: e.to_string() })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        }),
        Ok(Err(e)) => Err(AdapterError::Spawn { tool: program.to_owned(), message: e.to_string() }),
        Err(_) => Err(AdapterError::Timeout { tool: program.to_owned(), after: timeout }),
    }
}

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether `command` resolves on `PATH`.
pub async fn command_exists(command: &str) -> bool {
    let checker = if cfg!(windows) { "where" } else { "which" };
    match run(checker, &[command], LOOKUP_TIMEOUT).await {
        Ok(out) => out.success() && !out.stdout.trim().is_empty(),
        Err(_) => false,
    }
}

/// Package runners in order of preference. On Windows these are shims that
/// cannot be spawned by their bare name.
#[cfg(windows)]
const RUNNERS: &[&str] = &["bunx.exe", "bunx.cmd", "npx.cmd"];
#[cfg(not(windows))]
const RUNNERS: &[&str] = &["bunx", "npx"];

#[cfg(windows)]
const FALLBACK_RUNNER: &str = "npx.cmd";
#[cfg(not(windows))]
const FALLBACK_RUNNER: &str = "npx";

static PACKAGE_RUNNER: OnceCell<&'static str> = OnceCell::const_new();

/// First of `candidates` that resolves on `PATH`.
pub async fn first_available(candidates: &[&'static str]) -> Option<&'static str> {
    for &candidate in candidates {
        if command_exists(candidate).await {
            return Some(candidate);
        }
    }
    None
}

/// `bunx` when installed, otherwise `npx`. Resolved once per process.
pub async fn package_runner() -> &'static str {
    PACKAGE_RUNNER
        .get_or_init(|| async {
            let runner = first_available(RUNNERS).await.unwrap_or(FALLBACK_RUNNER);
            tracing::debug!(runner, "resolved package runner");
            runner
        })
        .await
}

/// Run an npm package binary through the package runner.
pub async fn run_package(
    package: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<ExecOutput, AdapterError> {
    let runner = package_runner().await;
    let mut full = Vec::with_capacity(args.len() + 1);
    full.push(package);
    full.extend_from_slice(args);
    run(runner, &full, timeout).await
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
