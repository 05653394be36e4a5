//! Subprocess execution.
//!
//! The [`Executor`] trait is the seam between the engine and external
//! programs (`git`, `bash`).  [`SystemExecutor`] spawns real processes;
//! tests substitute their own implementations.

use std::io;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
    /// `true` if the process exited with status zero.
    pub success: bool,
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    /// Stdout and stderr joined, trimmed.  Git reports most failures on
    /// stderr but some (e.g. "nothing to commit") on stdout.
    #[must_use]
    pub fn combined(&self) -> String {
        let out = self.stdout.trim();
        let err = self.stderr.trim();
        match (out.is_empty(), err.is_empty()) {
            (true, _) => err.to_string(),
            (false, true) => out.to_string(),
            (false, false) => format!("{out}\n{err}"),
        }
    }
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Runs external programs.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `program` in `dir` with extra environment variables and capture
    /// its output.  A non-zero exit is reported through
    /// [`ExecResult::success`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process could not be spawned.
    fn run_in(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> io::Result<ExecResult>;

    /// Run `program` in `dir` with stdio inherited from this process and
    /// return its exit code.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process could not be spawned.
    fn run_inherited(&self, dir: &Path, program: &str, args: &[&str]) -> io::Result<Option<i32>>;

    /// Returns `true` if `program` is on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_in(
        &self,
        dir: &Path,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> io::Result<ExecResult> {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(dir).stdin(Stdio::null());
        for (k, v) in env {
            cmd.env(k, v);
        }
        tracing::trace!(program, ?args, dir = %dir.display(), "exec");
        cmd.output().map(ExecResult::from)
    }

    fn run_inherited(&self, dir: &Path, program: &str, args: &[&str]) -> io::Result<Option<i32>> {
        tracing::trace!(program, ?args, dir = %dir.display(), "exec (inherited stdio)");
        let status = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(status.code())
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
